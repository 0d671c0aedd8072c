mod config;
pub mod records;
pub mod snapshot;

pub use config::{Config, InsightConfig};
pub use records::{DecisionRecord, DecisionStats, Outcome, RecordStore, SqliteRecordStore};
pub use snapshot::{FileSnapshotStore, MemorySnapshotStore, Snapshot, SnapshotStore};

use std::path::PathBuf;

/// Returns `~/.config/verdict[-dev]/` based on VERDICT_ENV.
///
/// Set VERDICT_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("VERDICT_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("verdict-dev")
    } else {
        base_dir.join("verdict")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
