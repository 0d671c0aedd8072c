//! SQLite-backed storage for finalized decision records.
//!
//! Provides persistent storage for:
//! - Finalized decisions (one immutable row per resolved draft)
//! - The one-way outcome rating, gated by the lock window
//! - Aggregate statistics per user

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, RatingError, StorageError};
use crate::policy::Verdict;

/// Post-hoc rating of how the decision turned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pending,
    Good,
    Bad,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Pending => "pending",
            Outcome::Good => "good",
            Outcome::Bad => "bad",
        }
    }

    fn parse(s: &str) -> Result<Self, StorageError> {
        match s {
            "pending" => Ok(Outcome::Pending),
            "good" => Ok(Outcome::Good),
            "bad" => Ok(Outcome::Bad),
            other => Err(StorageError::QueryFailed(format!(
                "unknown outcome value: {other}"
            ))),
        }
    }
}

/// The durable, finalized result of a resolved draft.
///
/// `pros`/`cons`/`question` are snapshots taken at resolution; later draft
/// edits never reach a finalized record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: String,
    pub user_id: String,
    pub question: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub result: Verdict,
    pub created_at_ms: u64,
    /// `outcome` may not be set before this time.
    pub locked_until_ms: u64,
    pub outcome: Outcome,
    /// The configured timer duration in whole minutes, for aggregate stats.
    pub time_saved_min: u64,
}

/// Aggregate statistics over a user's decision history.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DecisionStats {
    pub total_decisions: u64,
    pub yes_count: u64,
    pub no_count: u64,
    pub rated_good: u64,
    pub rated_bad: u64,
    pub unrated: u64,
    pub time_saved_min: u64,
}

/// Durable store for decision records.
///
/// `persist` must be idempotent by record id: calling it again with the same
/// record after a failed or uncertain first attempt never creates a
/// duplicate. This is what makes `finalize` retries safe.
pub trait RecordStore {
    fn persist(&self, record: &DecisionRecord) -> Result<(), StorageError>;
    fn get(&self, id: &str) -> Result<Option<DecisionRecord>, StorageError>;
    /// One-way PENDING -> GOOD|BAD transition, rejected before the lock
    /// window elapses and after a rating already exists.
    fn rate(&self, id: &str, outcome: Outcome, now_ms: u64) -> Result<(), CoreError>;
    fn list_for_user(&self, user_id: &str) -> Result<Vec<DecisionRecord>, StorageError>;
    fn stats(&self, user_id: &str) -> Result<DecisionStats, StorageError>;
}

/// SQLite implementation of [`RecordStore`].
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    /// Open the database at `<data_dir>/verdict.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        let path = super::data_dir()
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?
            .join("verdict.db");
        Self::open_at(path)
    }

    /// Open the database at an explicit path (tests use a tempdir).
    pub fn open_at(path: std::path::PathBuf) -> Result<Self, StorageError> {
        let conn = Connection::open(&path).map_err(|source| StorageError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database (tests and simulations).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS decisions (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL,
                question        TEXT NOT NULL,
                pros            TEXT NOT NULL,
                cons            TEXT NOT NULL,
                result          TEXT NOT NULL,
                created_at_ms   INTEGER NOT NULL,
                locked_until_ms INTEGER NOT NULL,
                outcome         TEXT NOT NULL DEFAULT 'pending',
                time_saved_min  INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_decisions_user_id ON decisions(user_id);
            CREATE INDEX IF NOT EXISTS idx_decisions_user_created
                ON decisions(user_id, created_at_ms);",
        )?;
        Ok(())
    }

    /// Get a value from the key-value store (drivers keep engine state here
    /// between invocations).
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<DecisionRecord> {
        let pros_json: String = row.get(3)?;
        let cons_json: String = row.get(4)?;
        let result_str: String = row.get(5)?;
        let outcome_str: String = row.get(8)?;
        Ok(DecisionRecord {
            id: row.get(0)?,
            user_id: row.get(1)?,
            question: row.get(2)?,
            pros: serde_json::from_str(&pros_json).unwrap_or_default(),
            cons: serde_json::from_str(&cons_json).unwrap_or_default(),
            result: if result_str == "yes" {
                Verdict::Yes
            } else {
                Verdict::No
            },
            created_at_ms: row.get(6)?,
            locked_until_ms: row.get(7)?,
            outcome: Outcome::parse(&outcome_str).unwrap_or(Outcome::Pending),
            time_saved_min: row.get(9)?,
        })
    }
}

impl RecordStore for SqliteRecordStore {
    fn persist(&self, record: &DecisionRecord) -> Result<(), StorageError> {
        let result_str = match record.result {
            Verdict::Yes => "yes",
            Verdict::No => "no",
        };
        // INSERT OR IGNORE keyed on id: a retry after an uncertain first
        // attempt never creates a second row.
        self.conn.execute(
            "INSERT OR IGNORE INTO decisions
                (id, user_id, question, pros, cons, result,
                 created_at_ms, locked_until_ms, outcome, time_saved_min)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.id,
                record.user_id,
                record.question,
                serde_json::to_string(&record.pros)
                    .map_err(|e| StorageError::QueryFailed(e.to_string()))?,
                serde_json::to_string(&record.cons)
                    .map_err(|e| StorageError::QueryFailed(e.to_string()))?,
                result_str,
                record.created_at_ms,
                record.locked_until_ms,
                record.outcome.as_str(),
                record.time_saved_min,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<DecisionRecord>, StorageError> {
        let record = self
            .conn
            .query_row(
                "SELECT id, user_id, question, pros, cons, result,
                        created_at_ms, locked_until_ms, outcome, time_saved_min
                 FROM decisions WHERE id = ?1",
                params![id],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn rate(&self, id: &str, outcome: Outcome, now_ms: u64) -> Result<(), CoreError> {
        let record = self
            .get(id)
            .map_err(CoreError::from)?
            .ok_or_else(|| RatingError::NotFound(id.to_string()))?;

        if record.outcome != Outcome::Pending {
            return Err(RatingError::AlreadyRated.into());
        }
        if now_ms < record.locked_until_ms {
            return Err(RatingError::Locked {
                locked_until_ms: record.locked_until_ms,
            }
            .into());
        }
        // The WHERE guard keeps the transition one-way even if another
        // process raced us between the read and the write.
        let changed = self
            .conn
            .execute(
                "UPDATE decisions SET outcome = ?1 WHERE id = ?2 AND outcome = 'pending'",
                params![outcome.as_str(), id],
            )
            .map_err(StorageError::from)?;
        if changed == 0 {
            return Err(RatingError::AlreadyRated.into());
        }
        Ok(())
    }

    fn list_for_user(&self, user_id: &str) -> Result<Vec<DecisionRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, question, pros, cons, result,
                    created_at_ms, locked_until_ms, outcome, time_saved_min
             FROM decisions WHERE user_id = ?1
             ORDER BY created_at_ms DESC",
        )?;
        let rows = stmt.query_map(params![user_id], Self::row_to_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn stats(&self, user_id: &str) -> Result<DecisionStats, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT result, outcome, COUNT(*), COALESCE(SUM(time_saved_min), 0)
             FROM decisions WHERE user_id = ?1
             GROUP BY result, outcome",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u64>(3)?,
            ))
        })?;

        let mut stats = DecisionStats::default();
        for row in rows {
            let (result, outcome, count, minutes) = row?;
            stats.total_decisions += count;
            stats.time_saved_min += minutes;
            match result.as_str() {
                "yes" => stats.yes_count += count,
                "no" => stats.no_count += count,
                _ => {}
            }
            match outcome.as_str() {
                "good" => stats.rated_good += count,
                "bad" => stats.rated_bad += count,
                "pending" => stats.unrated += count,
                _ => {}
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, user: &str, result: Verdict) -> DecisionRecord {
        DecisionRecord {
            id: id.to_string(),
            user_id: user.to_string(),
            question: "Take the job?".into(),
            pros: vec!["more pay".into(), "growth".into()],
            cons: vec!["commute".into()],
            result,
            created_at_ms: 1_000_000,
            locked_until_ms: 2_000_000,
            outcome: Outcome::Pending,
            time_saved_min: 5,
        }
    }

    #[test]
    fn persist_is_idempotent_by_id() {
        let store = SqliteRecordStore::open_memory().unwrap();
        let rec = record("r1", "alice", Verdict::Yes);
        store.persist(&rec).unwrap();
        store.persist(&rec).unwrap();
        assert_eq!(store.list_for_user("alice").unwrap().len(), 1);
    }

    #[test]
    fn get_round_trips_lists() {
        let store = SqliteRecordStore::open_memory().unwrap();
        store.persist(&record("r1", "alice", Verdict::Yes)).unwrap();
        let got = store.get("r1").unwrap().unwrap();
        assert_eq!(got.pros, ["more pay", "growth"]);
        assert_eq!(got.cons, ["commute"]);
        assert_eq!(got.result, Verdict::Yes);
        assert_eq!(got.outcome, Outcome::Pending);
    }

    #[test]
    fn rate_rejected_inside_lock_window() {
        let store = SqliteRecordStore::open_memory().unwrap();
        store.persist(&record("r1", "alice", Verdict::Yes)).unwrap();

        let err = store.rate("r1", Outcome::Good, 1_500_000).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Rating(RatingError::Locked {
                locked_until_ms: 2_000_000
            })
        ));
        assert_eq!(store.get("r1").unwrap().unwrap().outcome, Outcome::Pending);
    }

    #[test]
    fn rate_is_one_way_after_lock_window() {
        let store = SqliteRecordStore::open_memory().unwrap();
        store.persist(&record("r1", "alice", Verdict::Yes)).unwrap();

        store.rate("r1", Outcome::Good, 2_000_001).unwrap();
        assert_eq!(store.get("r1").unwrap().unwrap().outcome, Outcome::Good);

        let err = store.rate("r1", Outcome::Bad, 2_000_002).unwrap_err();
        assert!(matches!(err, CoreError::Rating(RatingError::AlreadyRated)));
        assert_eq!(store.get("r1").unwrap().unwrap().outcome, Outcome::Good);
    }

    #[test]
    fn rate_unknown_id_is_not_found() {
        let store = SqliteRecordStore::open_memory().unwrap();
        let err = store.rate("missing", Outcome::Good, 0).unwrap_err();
        assert!(matches!(err, CoreError::Rating(RatingError::NotFound(_))));
    }

    #[test]
    fn kv_set_get_delete() {
        let store = SqliteRecordStore::open_memory().unwrap();
        assert!(store.kv_get("engine").unwrap().is_none());
        store.kv_set("engine", "{}").unwrap();
        store.kv_set("engine", "{\"phase\":\"configuring\"}").unwrap();
        assert_eq!(
            store.kv_get("engine").unwrap().as_deref(),
            Some("{\"phase\":\"configuring\"}")
        );
        store.kv_delete("engine").unwrap();
        assert!(store.kv_get("engine").unwrap().is_none());
    }

    #[test]
    fn stats_aggregate_per_user() {
        let store = SqliteRecordStore::open_memory().unwrap();
        store.persist(&record("r1", "alice", Verdict::Yes)).unwrap();
        store.persist(&record("r2", "alice", Verdict::No)).unwrap();
        store.persist(&record("r3", "bob", Verdict::Yes)).unwrap();
        store.rate("r2", Outcome::Bad, 3_000_000).unwrap();

        let stats = store.stats("alice").unwrap();
        assert_eq!(stats.total_decisions, 2);
        assert_eq!(stats.yes_count, 1);
        assert_eq!(stats.no_count, 1);
        assert_eq!(stats.rated_bad, 1);
        assert_eq!(stats.unrated, 1);
        assert_eq!(stats.time_saved_min, 10);
    }
}
