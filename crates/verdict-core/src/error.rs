//! Core error types for verdict-core.
//!
//! This module defines the error hierarchy using thiserror. Validation and
//! illegal-transition failures are distinct variants so callers (and tests)
//! can tell a bad input from a contract violation.

use std::path::PathBuf;
use thiserror::Error;

use crate::policy::Side;

/// Core error type for verdict-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Validation errors (bad inputs to an otherwise legal operation)
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Illegal state-machine transitions
    #[error("Illegal transition: {0}")]
    Transition(#[from] TransitionError),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Outcome-rating errors
    #[error("Rating error: {0}")]
    Rating(#[from] RatingError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors: the operation was legal for the current state but the
/// input violates a draft invariant. Never silently clamped.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// The question must be set before the countdown can start
    #[error("Question must not be empty")]
    EmptyQuestion,

    /// At least one pro or con is required to start
    #[error("Add at least one pro or con")]
    NoArguments,

    /// A pro/con entry must contain visible text
    #[error("{side} entry must not be empty")]
    EmptyEntry { side: Side },

    /// A pro/con entry exceeds the per-entry length cap
    #[error("{side} entry exceeds {max} characters")]
    EntryTooLong { side: Side, max: usize },

    /// The pro/con list is already at capacity
    #[error("{side} list is full (max {max})")]
    ListFull { side: Side, max: usize },

    /// Index out of bounds for a pro/con list
    #[error("Index {index} out of bounds for {side} list (length: {len})")]
    OutOfBounds {
        side: Side,
        index: usize,
        len: usize,
    },

    /// Timer duration must be positive
    #[error("Timer duration must be greater than zero")]
    ZeroDuration,
}

/// Illegal state-machine transitions. These indicate a contract violation by
/// the caller, not a bad input, and are never treated as silent no-ops.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransitionError {
    /// Draft mutation attempted after the countdown started
    #[error("Draft is locked once the countdown has started")]
    EditAfterStart,

    /// `start` called while already counting or resolved
    #[error("Countdown already started")]
    AlreadyStarted,

    /// An operation that requires a running countdown
    #[error("No countdown is running")]
    NotCounting,

    /// The one-time extension was already consumed
    #[error("Extension already used")]
    ExtendAlreadyUsed,

    /// `decide_now`/`tick` arrived after the decision was already resolved;
    /// the existing verdict stands and no second result is computed
    #[error("Decision already resolved")]
    AlreadyResolved,

    /// `finalize` called before any verdict exists
    #[error("Nothing to finalize: decision is not resolved")]
    NotResolved,
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the records database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Snapshot read/write failed
    #[error("Snapshot store failed: {0}")]
    SnapshotFailed(String),
}

/// Errors from rating a finalized record's outcome.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RatingError {
    /// No record with the given id
    #[error("No decision record with id {0}")]
    NotFound(String),

    /// The lock window has not elapsed yet
    #[error("Record is locked until epoch ms {locked_until_ms}")]
    Locked { locked_until_ms: u64 },

    /// The outcome was already set; the transition is one-way
    #[error("Record has already been rated")]
    AlreadyRated,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::QueryFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
