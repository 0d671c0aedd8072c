//! # Verdict Core Library
//!
//! This library provides the core business logic for Verdict, a decision
//! timer that forces a yes/no call within a bounded window, records the
//! outcome exactly once, and lets the user rate it later.
//!
//! ## Architecture
//!
//! - **Decision Engine**: A wall-clock-based state machine that requires the
//!   caller to periodically invoke `tick()` for progress; resolution happens
//!   at most once per draft and is fixed before any I/O
//! - **Resolution Policy**: Pure pros/cons comparison with an injectable
//!   tie-break strategy
//! - **Storage**: SQLite-backed decision records, JSON snapshot files for
//!   crash/reload recovery, TOML configuration
//! - **Recovery**: Startup reconciliation of a persisted countdown with the
//!   wall clock
//! - **Insight**: Best-effort completion-service client with a canned
//!   fallback
//!
//! ## Key Components
//!
//! - [`DecisionEngine`]: Core state machine
//! - [`recover`]: Startup recovery entry point
//! - [`SqliteRecordStore`]: Durable decision records
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod draft;
pub mod engine;
pub mod error;
pub mod events;
pub mod insight;
pub mod policy;
pub mod recovery;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use draft::{DecisionDraft, MAX_ENTRIES, MAX_ENTRY_LEN};
pub use engine::{DecisionEngine, Phase, ResolvedVia};
pub use error::{
    ConfigError, CoreError, RatingError, StorageError, TransitionError, ValidationError,
};
pub use events::Event;
pub use insight::{InsightClient, FALLBACK_INSIGHT};
pub use policy::{CoinFlip, FixedTieBreak, Side, TieBreak, Verdict};
pub use recovery::{recover, Recovery};
pub use store::{
    Config, DecisionRecord, DecisionStats, FileSnapshotStore, InsightConfig, MemorySnapshotStore,
    Outcome, RecordStore, Snapshot, SnapshotStore, SqliteRecordStore,
};
