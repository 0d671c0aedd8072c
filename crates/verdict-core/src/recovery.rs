//! Startup recovery for in-progress countdowns.
//!
//! Runs once at process start, before anything renders timer state. The
//! countdown is wall-clock-anchored, so a reload or suspend gap costs no
//! time: either the deadline is still ahead (re-enter `Counting` with the
//! true remaining time) or it already passed (resolve and finalize through
//! the exact same path a live expiry takes, before the caller sees a timer).

use crate::clock::Clock;
use crate::engine::DecisionEngine;
use crate::error::Result;
use crate::policy::{TieBreak, Verdict};
use crate::store::Config;
use crate::store::records::RecordStore;
use crate::store::snapshot::SnapshotStore;

/// What startup recovery found and did.
#[derive(Debug)]
pub enum Recovery {
    /// No snapshot: begin configuring a new decision.
    Fresh(DecisionEngine),
    /// Deadline still ahead: countdown re-entered with wall-clock remaining.
    Resumed {
        engine: DecisionEngine,
        remaining_ms: u64,
    },
    /// Deadline passed while we were away: resolved and finalized before
    /// any timer state became visible. `saved` is false when the final
    /// write failed; the engine is parked resolved-but-unsaved and
    /// `finalize` may be retried on it. Even when saved, the engine may
    /// still report `needs_snapshot_clear` -- callers must keep it around
    /// until the stale snapshot is gone, or the draft would resolve again.
    AutoResolved {
        engine: DecisionEngine,
        record_id: String,
        result: Verdict,
        saved: bool,
    },
}

/// Load the user's snapshot and reconcile it with the wall clock.
pub fn recover(
    config: &Config,
    snapshots: &dyn SnapshotStore,
    records: &dyn RecordStore,
    clock: &dyn Clock,
    tie: &mut dyn TieBreak,
) -> Result<Recovery> {
    let Some(snapshot) = snapshots.load(&config.user_id)? else {
        return Ok(Recovery::Fresh(DecisionEngine::with_settings(
            config.extend_bonus_secs,
            config.rating_lock_ms(),
        )));
    };

    let draft = snapshot.into_draft()?;
    let mut engine =
        DecisionEngine::resume(draft, config.extend_bonus_secs, config.rating_lock_ms());

    let now_ms = clock.now_ms();
    let remaining_ms = engine.remaining_ms(now_ms);
    if remaining_ms > 0 {
        return Ok(Recovery::Resumed {
            engine,
            remaining_ms,
        });
    }

    // Same auto-expiry path as a live timeout. tick() cannot return None
    // here: the engine is counting and remaining is zero.
    let _resolved = engine.tick(now_ms, tie);
    debug_assert!(_resolved.is_some());
    let record_id = engine
        .record_id()
        .unwrap_or_default()
        .to_string();
    let result = engine.result().unwrap_or(Verdict::No);

    let saved = engine
        .finalize(&config.user_id, records, snapshots)
        .is_ok();
    Ok(Recovery::AutoResolved {
        engine,
        record_id,
        result,
        saved,
    })
}
