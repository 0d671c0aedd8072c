//! Ephemeral countdown snapshots for crash/reload recovery.
//!
//! One snapshot per user key, overwritten on every state-mutating transition
//! while counting. The snapshot is not the source of truth for the verdict;
//! it only carries enough to re-anchor the wall-clock countdown.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::draft::DecisionDraft;
use crate::error::StorageError;
use crate::policy::Side;

/// Persisted shape of an in-progress countdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub question: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub timer_duration_secs: u64,
    pub started_at_ms: u64,
    pub pause_used: bool,
}

impl Snapshot {
    /// Capture a committed draft. Returns `None` before the countdown
    /// has started (there is nothing worth recovering).
    pub fn of(draft: &DecisionDraft) -> Option<Self> {
        let started_at_ms = draft.started_at_ms()?;
        Some(Self {
            question: draft.question().to_string(),
            pros: draft.pros().to_vec(),
            cons: draft.cons().to_vec(),
            timer_duration_secs: draft.timer_duration_secs(),
            started_at_ms,
            pause_used: draft.pause_used(),
        })
    }

    /// Rebuild a counting draft from the snapshot.
    pub fn into_draft(self) -> Result<DecisionDraft, StorageError> {
        let mut draft = DecisionDraft::new();
        draft
            .set_question(&self.question)
            .map_err(|e| StorageError::SnapshotFailed(e.to_string()))?;
        for pro in &self.pros {
            draft
                .add(Side::Pro, pro)
                .map_err(|e| StorageError::SnapshotFailed(e.to_string()))?;
        }
        for con in &self.cons {
            draft
                .add(Side::Con, con)
                .map_err(|e| StorageError::SnapshotFailed(e.to_string()))?;
        }
        draft
            .commit(self.timer_duration_secs, self.started_at_ms)
            .map_err(|e| StorageError::SnapshotFailed(e.to_string()))?;
        if self.pause_used {
            // The stored duration already includes the consumed bonus;
            // only the flag needs re-marking.
            draft.apply_extension(0);
        }
        Ok(draft)
    }
}

/// Local key-value store for in-progress snapshots, keyed by user.
pub trait SnapshotStore {
    fn save(&self, user_id: &str, snapshot: &Snapshot) -> Result<(), StorageError>;
    fn load(&self, user_id: &str) -> Result<Option<Snapshot>, StorageError>;
    fn clear(&self, user_id: &str) -> Result<(), StorageError>;
}

/// One JSON file per user under the app data dir.
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Store snapshots under the default data dir.
    pub fn open() -> Result<Self, std::io::Error> {
        Ok(Self {
            dir: super::data_dir()?,
        })
    }

    /// Store snapshots under an explicit directory (tests use a tempdir).
    pub fn at(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        // User ids are opaque; sanitize so they cannot escape the dir.
        let safe: String = user_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.snapshot.json"))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, user_id: &str, snapshot: &Snapshot) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| StorageError::SnapshotFailed(e.to_string()))?;
        std::fs::write(self.path_for(user_id), json)
            .map_err(|e| StorageError::SnapshotFailed(e.to_string()))
    }

    fn load(&self, user_id: &str) -> Result<Option<Snapshot>, StorageError> {
        let path = self.path_for(user_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path)
            .map_err(|e| StorageError::SnapshotFailed(e.to_string()))?;
        let snapshot = serde_json::from_str(&json)
            .map_err(|e| StorageError::SnapshotFailed(e.to_string()))?;
        Ok(Some(snapshot))
    }

    fn clear(&self, user_id: &str) -> Result<(), StorageError> {
        let path = self.path_for(user_id);
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| StorageError::SnapshotFailed(e.to_string()))?;
        }
        Ok(())
    }
}

/// In-memory store for tests and simulations.
#[derive(Default)]
pub struct MemorySnapshotStore {
    map: Mutex<HashMap<String, Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, user_id: &str, snapshot: &Snapshot) -> Result<(), StorageError> {
        self.map
            .lock()
            .expect("snapshot map poisoned")
            .insert(user_id.to_string(), snapshot.clone());
        Ok(())
    }

    fn load(&self, user_id: &str) -> Result<Option<Snapshot>, StorageError> {
        Ok(self
            .map
            .lock()
            .expect("snapshot map poisoned")
            .get(user_id)
            .cloned())
    }

    fn clear(&self, user_id: &str) -> Result<(), StorageError> {
        self.map
            .lock()
            .expect("snapshot map poisoned")
            .remove(user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Side;

    fn counting_draft() -> DecisionDraft {
        let mut draft = DecisionDraft::new();
        draft.set_question("Take the job?").unwrap();
        draft.add(Side::Pro, "more pay").unwrap();
        draft.add(Side::Con, "commute").unwrap();
        draft.commit(300, 1_000_000).unwrap();
        draft
    }

    #[test]
    fn snapshot_round_trips_a_counting_draft() {
        let draft = counting_draft();
        let snap = Snapshot::of(&draft).unwrap();
        let restored = snap.into_draft().unwrap();
        assert_eq!(restored.question(), "Take the job?");
        assert_eq!(restored.pros(), ["more pay"]);
        assert_eq!(restored.cons(), ["commute"]);
        assert_eq!(restored.started_at_ms(), Some(1_000_000));
        assert_eq!(restored.timer_duration_secs(), 300);
        assert!(!restored.pause_used());
    }

    #[test]
    fn snapshot_preserves_consumed_extension() {
        let mut draft = counting_draft();
        draft.apply_extension(300);
        let snap = Snapshot::of(&draft).unwrap();
        assert!(snap.pause_used);
        assert_eq!(snap.timer_duration_secs, 600);

        let restored = snap.into_draft().unwrap();
        assert!(restored.pause_used());
        assert_eq!(restored.timer_duration_secs(), 600);
    }

    #[test]
    fn unstarted_draft_has_no_snapshot() {
        let draft = DecisionDraft::new();
        assert!(Snapshot::of(&draft).is_none());
    }

    #[test]
    fn file_store_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::at(dir.path().to_path_buf());
        let snap = Snapshot::of(&counting_draft()).unwrap();

        assert!(store.load("alice").unwrap().is_none());
        store.save("alice", &snap).unwrap();
        let loaded = store.load("alice").unwrap().unwrap();
        assert_eq!(loaded.question, "Take the job?");

        store.clear("alice").unwrap();
        assert!(store.load("alice").unwrap().is_none());
        // Clearing again is harmless.
        store.clear("alice").unwrap();
    }

    #[test]
    fn file_store_keys_are_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::at(dir.path().to_path_buf());
        let snap = Snapshot::of(&counting_draft()).unwrap();
        store.save("alice", &snap).unwrap();
        assert!(store.load("bob").unwrap().is_none());
    }
}
