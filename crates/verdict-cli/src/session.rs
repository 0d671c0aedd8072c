//! Per-invocation session: config, stores, and the recovered engine.
//!
//! Every command loads the session the same way. A resolved decision whose
//! finalization is incomplete (parked in the kv slot) is restored as-is,
//! verdict intact, before snapshot recovery gets a chance to run. Otherwise
//! recovery runs: a countdown that expired while the process was away
//! resolves before anything is printed. Last comes a configuring draft from
//! the kv slot, or a fresh engine.

use verdict_core::{
    recover, Clock, CoinFlip, Config, DecisionEngine, Event, FileSnapshotStore, Phase, Recovery,
    SnapshotStore, SqliteRecordStore, SystemClock,
};

const ENGINE_KEY: &str = "decision_engine";

pub struct Session {
    pub config: Config,
    pub records: SqliteRecordStore,
    pub snapshots: Box<dyn SnapshotStore>,
    pub engine: DecisionEngine,
    pub clock: Box<dyn Clock>,
}

impl Session {
    /// Load stores and recover engine state. Events produced during
    /// recovery (auto-resolution, record writes) are returned so commands
    /// can print them before their own output.
    pub fn load() -> Result<(Self, Vec<Event>), Box<dyn std::error::Error>> {
        Self::load_from(
            Config::load()?,
            SqliteRecordStore::open()?,
            Box::new(FileSnapshotStore::open()?),
            Box::new(SystemClock),
        )
    }

    fn load_from(
        config: Config,
        records: SqliteRecordStore,
        snapshots: Box<dyn SnapshotStore>,
        clock: Box<dyn Clock>,
    ) -> Result<(Self, Vec<Event>), Box<dyn std::error::Error>> {
        let mut events = Vec::new();

        let kv_engine: Option<DecisionEngine> = records
            .kv_get(ENGINE_KEY)?
            .and_then(|json| serde_json::from_str(&json).ok());

        // A resolved decision with incomplete finalization takes precedence
        // over snapshot recovery: its verdict is already fixed and must
        // never be recomputed, and its stale snapshot must not resolve the
        // same draft a second time.
        if kv_engine
            .as_ref()
            .is_some_and(|e| e.is_unsaved() || e.needs_snapshot_clear())
        {
            let mut engine = kv_engine.unwrap_or_default();
            if engine.needs_snapshot_clear() {
                // The record is already durable; only the clear retries.
                let _ = engine.finalize(&config.user_id, &records, snapshots.as_ref());
                if !engine.needs_snapshot_clear() {
                    records.kv_delete(ENGINE_KEY)?;
                }
            }
            return Ok((
                Self {
                    config,
                    records,
                    snapshots,
                    engine,
                    clock,
                },
                events,
            ));
        }

        let mut tie = CoinFlip;
        let recovery = recover(&config, snapshots.as_ref(), &records, clock.as_ref(), &mut tie)?;
        let engine = match recovery {
            Recovery::Resumed { engine, .. } => engine,
            Recovery::AutoResolved {
                engine,
                record_id,
                result,
                saved,
            } => {
                events.push(Event::DecisionResolved {
                    result,
                    via: verdict_core::ResolvedVia::Expired,
                    at: chrono::Utc::now(),
                });
                if saved {
                    events.push(Event::RecordSaved {
                        record_id,
                        result,
                        at: chrono::Utc::now(),
                    });
                    if engine.needs_snapshot_clear() {
                        // Park until the stale snapshot is gone.
                        records.kv_set(ENGINE_KEY, &serde_json::to_string(&engine)?)?;
                    } else {
                        records.kv_delete(ENGINE_KEY)?;
                    }
                } else {
                    // Parked unsaved; `timer status` retries the write.
                    eprintln!("warning: decision resolved but not yet saved; run `verdict timer status` to retry");
                }
                engine
            }
            Recovery::Fresh(fresh) => kv_engine.unwrap_or(fresh),
        };

        Ok((
            Self {
                config,
                records,
                snapshots,
                engine,
                clock,
            },
            events,
        ))
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Retry whatever part of finalization is still outstanding: the record
    /// write if the engine is parked resolved-but-unsaved, or the removal
    /// of a stale snapshot left behind by an earlier failed clear.
    pub fn retry_finalize(&mut self) -> Result<Option<Event>, Box<dyn std::error::Error>> {
        if self.engine.is_unsaved() {
            let event =
                self.engine
                    .finalize(&self.config.user_id, &self.records, self.snapshots.as_ref())?;
            return Ok(Some(event));
        }
        if self.engine.needs_snapshot_clear() {
            // Record already durable, nothing to announce.
            self.engine
                .finalize(&self.config.user_id, &self.records, self.snapshots.as_ref())?;
        }
        Ok(None)
    }

    /// Persist engine state for the next invocation.
    ///
    /// While counting, the snapshot file is authoritative for recovery; a
    /// snapshot write failure is non-fatal (logged, countdown continues on
    /// the wall clock). Outside counting the kv slot carries the engine.
    pub fn persist(&self) -> Result<(), Box<dyn std::error::Error>> {
        match self.engine.phase() {
            Phase::Counting => {
                if let Some(snapshot) = self.engine.snapshot() {
                    match self.snapshots.save(&self.config.user_id, &snapshot) {
                        Ok(()) => self.records.kv_delete(ENGINE_KEY)?,
                        Err(e) => {
                            // Non-fatal: the countdown continues in memory
                            // and the kv slot keeps a fallback copy.
                            eprintln!("warning: snapshot write failed: {e}");
                            self.records
                                .kv_set(ENGINE_KEY, &serde_json::to_string(&self.engine)?)?;
                        }
                    }
                }
            }
            Phase::Configuring => {
                self.records
                    .kv_set(ENGINE_KEY, &serde_json::to_string(&self.engine)?)?;
            }
            Phase::Resolved => {
                if self.engine.is_unsaved() || self.engine.needs_snapshot_clear() {
                    self.records
                        .kv_set(ENGINE_KEY, &serde_json::to_string(&self.engine)?)?;
                } else {
                    self.records.kv_delete(ENGINE_KEY)?;
                }
            }
        }
        Ok(())
    }
}

/// Print an event as pretty JSON on stdout.
pub fn print_event(event: &Event) {
    match serde_json::to_string_pretty(event) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("error: failed to encode event: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::path::Path;
    use std::rc::Rc;
    use verdict_core::{
        FixedTieBreak, ManualClock, MemorySnapshotStore, RecordStore, Snapshot, StorageError,
        Verdict,
    };

    const START_MS: u64 = 1_700_000_000_000;

    /// Snapshot store with injectable save/clear failures, shared across
    /// simulated restarts via `Rc`.
    struct FlakySnapshotStore {
        inner: MemorySnapshotStore,
        fail_saves: Cell<u32>,
        fail_clears: Cell<u32>,
    }

    impl FlakySnapshotStore {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                inner: MemorySnapshotStore::new(),
                fail_saves: Cell::new(0),
                fail_clears: Cell::new(0),
            })
        }
    }

    impl SnapshotStore for FlakySnapshotStore {
        fn save(&self, user_id: &str, snapshot: &Snapshot) -> Result<(), StorageError> {
            if self.fail_saves.get() > 0 {
                self.fail_saves.set(self.fail_saves.get() - 1);
                return Err(StorageError::SnapshotFailed("injected failure".into()));
            }
            self.inner.save(user_id, snapshot)
        }

        fn load(&self, user_id: &str) -> Result<Option<Snapshot>, StorageError> {
            self.inner.load(user_id)
        }

        fn clear(&self, user_id: &str) -> Result<(), StorageError> {
            if self.fail_clears.get() > 0 {
                self.fail_clears.set(self.fail_clears.get() - 1);
                return Err(StorageError::SnapshotFailed("injected failure".into()));
            }
            self.inner.clear(user_id)
        }
    }

    /// Forwards to the shared store so an `Rc` handle can be boxed as a
    /// `Box<dyn SnapshotStore>` without an orphan impl on `Rc`.
    struct SharedSnapshots(Rc<FlakySnapshotStore>);

    impl SnapshotStore for SharedSnapshots {
        fn save(&self, user_id: &str, snapshot: &Snapshot) -> Result<(), StorageError> {
            self.0.save(user_id, snapshot)
        }

        fn load(&self, user_id: &str) -> Result<Option<Snapshot>, StorageError> {
            self.0.load(user_id)
        }

        fn clear(&self, user_id: &str) -> Result<(), StorageError> {
            self.0.clear(user_id)
        }
    }

    /// One CLI invocation against on-disk records and the shared snapshot
    /// store; calling again with the same dir simulates a restart.
    fn boot(
        dir: &Path,
        snapshots: &Rc<FlakySnapshotStore>,
        now_ms: u64,
    ) -> (Session, Vec<Event>) {
        let records = SqliteRecordStore::open_at(dir.join("verdict.db")).unwrap();
        Session::load_from(
            Config::default(),
            records,
            Box::new(SharedSnapshots(Rc::clone(snapshots))),
            Box::new(ManualClock::new(now_ms)),
        )
        .unwrap()
    }

    fn start_countdown(session: &mut Session, duration_secs: u64) {
        session.engine.set_question("Take the job?").unwrap();
        session.engine.add_pro("more pay").unwrap();
        session.engine.start(duration_secs, session.now_ms()).unwrap();
        session.persist().unwrap();
    }

    #[test]
    fn stale_snapshot_after_failed_clear_never_resolves_twice() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = FlakySnapshotStore::new();

        let (mut session, _) = boot(dir.path(), &snapshots, START_MS);
        start_countdown(&mut session, 5);

        let mut tie = FixedTieBreak(Verdict::No);
        session.engine.tick(START_MS + 5_000, &mut tie).unwrap();
        let record_id = session.engine.record_id().unwrap().to_string();

        // The record lands but the snapshot clear fails; the engine parks
        // in the kv slot with the stale snapshot still present.
        snapshots.fail_clears.set(1);
        session.retry_finalize().unwrap().unwrap();
        assert!(session.engine.needs_snapshot_clear());
        session.persist().unwrap();
        assert!(snapshots.load("local").unwrap().is_some());

        // Restart: the parked engine wins over the stale snapshot, the
        // clear retries, and no second record is written.
        let (session, events) = boot(dir.path(), &snapshots, START_MS + 60_000);
        assert!(events.is_empty());
        assert_eq!(session.engine.record_id(), Some(record_id.as_str()));
        assert!(!session.engine.needs_snapshot_clear());
        assert!(snapshots.load("local").unwrap().is_none());
        assert_eq!(session.records.list_for_user("local").unwrap().len(), 1);

        // A further restart recovers nothing stale.
        let (_, events) = boot(dir.path(), &snapshots, START_MS + 120_000);
        assert!(events.is_empty());
    }

    #[test]
    fn snapshot_write_failure_keeps_countdown_via_kv_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = FlakySnapshotStore::new();

        let (mut session, _) = boot(dir.path(), &snapshots, START_MS);
        snapshots.fail_saves.set(u32::MAX);
        start_countdown(&mut session, 60);
        assert!(snapshots.load("local").unwrap().is_none());

        // Restart 10s later: no snapshot on disk, but the kv fallback
        // restores the countdown on the original wall-clock anchor.
        let (session, events) = boot(dir.path(), &snapshots, START_MS + 10_000);
        assert!(events.is_empty());
        assert_eq!(session.engine.phase(), Phase::Counting);
        assert_eq!(session.engine.remaining_ms(session.now_ms()), 50_000);
        assert_eq!(session.engine.draft().question(), "Take the job?");
    }

    #[test]
    fn recovered_snapshot_still_beats_stale_kv_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = FlakySnapshotStore::new();

        // First persist falls back to kv, the next one succeeds; the
        // snapshot file is authoritative again and the fallback is dropped.
        let (mut session, _) = boot(dir.path(), &snapshots, START_MS);
        snapshots.fail_saves.set(1);
        start_countdown(&mut session, 60);
        assert!(snapshots.load("local").unwrap().is_none());
        session.persist().unwrap();
        assert!(snapshots.load("local").unwrap().is_some());
        assert!(session.records.kv_get("decision_engine").unwrap().is_none());

        let (session, _) = boot(dir.path(), &snapshots, START_MS + 10_000);
        assert_eq!(session.engine.phase(), Phase::Counting);
        assert_eq!(session.engine.remaining_ms(session.now_ms()), 50_000);
    }
}
