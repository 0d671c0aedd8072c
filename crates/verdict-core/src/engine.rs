//! Decision timer state machine.
//!
//! The engine is a wall-clock-based state machine. It does not use internal
//! threads or read the system clock -- callers pass `now_ms` into every
//! time-dependent operation and are responsible for calling `tick()`
//! periodically.
//!
//! ## State Transitions
//!
//! ```text
//! Configuring -> Counting -> Resolved
//! ```
//!
//! `Resolved` carries how resolution happened (`Expired` or `UserOverride`)
//! and whether the final record write has succeeded yet. The verdict and the
//! record id are fixed at the moment of resolution, before any I/O, so a
//! `finalize` retry after a transient write failure can never flip the
//! result or duplicate the record.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::draft::DecisionDraft;
use crate::error::{Result, TransitionError};
use crate::events::Event;
use crate::policy::{self, Side, TieBreak, Verdict};
use crate::store::records::{DecisionRecord, Outcome, RecordStore};
use crate::store::snapshot::{Snapshot, SnapshotStore};

/// Default bonus added by the one-time extension.
pub const DEFAULT_EXTEND_BONUS_SECS: u64 = 300;
/// Default outcome-rating lock window.
pub const DEFAULT_RATING_LOCK_MS: u64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Configuring,
    Counting,
    Resolved,
}

/// How a resolved decision reached its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedVia {
    Expired,
    UserOverride,
}

/// The verdict captured at the moment of resolution.
///
/// Created before any I/O and immutable afterwards; `saved` flips to true
/// exactly once, when the record write succeeds, and `snapshot_cleared`
/// once the stale countdown snapshot is gone. Tracking the two separately
/// keeps finalization retryable whichever write failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PendingOutcome {
    record_id: String,
    result: Verdict,
    via: ResolvedVia,
    resolved_at_ms: u64,
    saved: bool,
    #[serde(default)]
    snapshot_cleared: bool,
}

/// Core decision timer engine.
///
/// Operates on wall-clock deltas -- no internal thread. The caller is
/// responsible for calling `tick()` periodically and for persisting
/// snapshots on state-mutating transitions while counting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEngine {
    draft: DecisionDraft,
    phase: Phase,
    #[serde(default)]
    pending: Option<PendingOutcome>,
    extend_bonus_secs: u64,
    rating_lock_ms: u64,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionEngine {
    /// Fresh engine in `Configuring` with an empty draft.
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_EXTEND_BONUS_SECS, DEFAULT_RATING_LOCK_MS)
    }

    pub fn with_settings(extend_bonus_secs: u64, rating_lock_ms: u64) -> Self {
        Self {
            draft: DecisionDraft::new(),
            phase: Phase::Configuring,
            pending: None,
            extend_bonus_secs,
            rating_lock_ms,
        }
    }

    /// Re-enter `Counting` from a recovered snapshot draft.
    ///
    /// The draft must already be committed (`started_at_ms` set); recovery
    /// guarantees this before calling.
    pub(crate) fn resume(
        draft: DecisionDraft,
        extend_bonus_secs: u64,
        rating_lock_ms: u64,
    ) -> Self {
        debug_assert!(draft.started_at_ms().is_some());
        Self {
            draft,
            phase: Phase::Counting,
            pending: None,
            extend_bonus_secs,
            rating_lock_ms,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn draft(&self) -> &DecisionDraft {
        &self.draft
    }

    /// The fixed verdict, once resolved.
    pub fn result(&self) -> Option<Verdict> {
        self.pending.as_ref().map(|p| p.result)
    }

    pub fn resolved_via(&self) -> Option<ResolvedVia> {
        self.pending.as_ref().map(|p| p.via)
    }

    /// Record id fixed at resolution; stable across finalize retries.
    pub fn record_id(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.record_id.as_str())
    }

    /// Resolved but the final record write has not succeeded yet.
    pub fn is_unsaved(&self) -> bool {
        matches!(&self.pending, Some(p) if !p.saved)
    }

    /// The record write landed but the stale countdown snapshot could not
    /// be removed; the next `finalize` call retries the clear. Drivers must
    /// keep the engine around in this state, or the stale snapshot would
    /// re-resolve the same draft on the next startup.
    pub fn needs_snapshot_clear(&self) -> bool {
        matches!(&self.pending, Some(p) if p.saved && !p.snapshot_cleared)
    }

    /// Milliseconds left on the countdown, clamped at zero.
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        let Some(started) = self.draft.started_at_ms() else {
            return self.draft.timer_duration_secs().saturating_mul(1000);
        };
        let total_ms = self.draft.timer_duration_secs().saturating_mul(1000);
        let elapsed = now_ms.saturating_sub(started);
        total_ms.saturating_sub(elapsed)
    }

    /// Snapshot of the running countdown, for the persistence adapter.
    /// `None` outside `Counting`.
    pub fn snapshot(&self) -> Option<Snapshot> {
        if self.phase != Phase::Counting {
            return None;
        }
        Snapshot::of(&self.draft)
    }

    /// Full state snapshot event (drivers print this as JSON).
    pub fn state_event(&self, now_ms: u64) -> Event {
        Event::StateSnapshot {
            phase: self.phase,
            question: self.draft.question().to_string(),
            pros: self.draft.pros().to_vec(),
            cons: self.draft.cons().to_vec(),
            remaining_ms: match self.phase {
                Phase::Counting => self.remaining_ms(now_ms),
                _ => 0,
            },
            pause_used: self.draft.pause_used(),
            at: Utc::now(),
        }
    }

    // ── Draft mutation (Configuring only) ────────────────────────────

    pub fn set_question(&mut self, text: &str) -> Result<()> {
        self.ensure_configuring()?;
        self.draft.set_question(text)?;
        Ok(())
    }

    pub fn add_pro(&mut self, text: &str) -> Result<()> {
        self.ensure_configuring()?;
        self.draft.add(Side::Pro, text)?;
        Ok(())
    }

    pub fn add_con(&mut self, text: &str) -> Result<()> {
        self.ensure_configuring()?;
        self.draft.add(Side::Con, text)?;
        Ok(())
    }

    pub fn remove_pro(&mut self, index: usize) -> Result<String> {
        self.ensure_configuring()?;
        Ok(self.draft.remove(Side::Pro, index)?)
    }

    pub fn remove_con(&mut self, index: usize) -> Result<String> {
        self.ensure_configuring()?;
        Ok(self.draft.remove(Side::Con, index)?)
    }

    pub fn star(&mut self, side: Side, index: Option<usize>) -> Result<()> {
        self.ensure_configuring()?;
        self.draft.star(side, index)?;
        Ok(())
    }

    fn ensure_configuring(&self) -> Result<(), TransitionError> {
        match self.phase {
            Phase::Configuring => Ok(()),
            Phase::Counting => Err(TransitionError::EditAfterStart),
            Phase::Resolved => Err(TransitionError::AlreadyResolved),
        }
    }

    // ── Countdown commands ───────────────────────────────────────────

    /// Begin the countdown. Fixes the wall-clock anchor; the caller must
    /// write an immediate snapshot on success.
    pub fn start(&mut self, duration_secs: u64, now_ms: u64) -> Result<Event> {
        if self.phase != Phase::Configuring {
            return Err(TransitionError::AlreadyStarted.into());
        }
        self.draft.commit(duration_secs, now_ms)?;
        self.phase = Phase::Counting;
        Ok(Event::CountdownStarted {
            duration_secs,
            at: Utc::now(),
        })
    }

    /// Call periodically. Resolves via the policy when time runs out.
    pub fn tick(&mut self, now_ms: u64, tie: &mut dyn TieBreak) -> Option<Event> {
        if self.phase != Phase::Counting {
            return None;
        }
        if self.remaining_ms(now_ms) > 0 {
            return None;
        }
        Some(self.resolve(None, ResolvedVia::Expired, now_ms, tie))
    }

    /// "Decide YES/NO now" shortcut, or policy-driven early resolution when
    /// `forced` is omitted. Only one path out of `Counting` can ever win:
    /// a call racing a tick-driven expiry observes `Resolved` and is
    /// rejected without computing a second result.
    pub fn decide_now(
        &mut self,
        forced: Option<Verdict>,
        now_ms: u64,
        tie: &mut dyn TieBreak,
    ) -> Result<Event> {
        match self.phase {
            Phase::Counting => Ok(self.resolve(forced, ResolvedVia::UserOverride, now_ms, tie)),
            Phase::Configuring => Err(TransitionError::NotCounting.into()),
            Phase::Resolved => Err(TransitionError::AlreadyResolved.into()),
        }
    }

    /// One-time extension: adds the configured bonus to the effective
    /// duration. Irreversible; a second call is rejected.
    pub fn extend(&mut self, now_ms: u64) -> Result<Event> {
        match self.phase {
            Phase::Counting => {}
            Phase::Configuring => return Err(TransitionError::NotCounting.into()),
            Phase::Resolved => return Err(TransitionError::AlreadyResolved.into()),
        }
        if self.draft.pause_used() {
            return Err(TransitionError::ExtendAlreadyUsed.into());
        }
        self.draft.apply_extension(self.extend_bonus_secs);
        Ok(Event::CountdownExtended {
            bonus_secs: self.extend_bonus_secs,
            remaining_ms: self.remaining_ms(now_ms),
            at: Utc::now(),
        })
    }

    /// Single transition out of `Counting`. Computes the verdict and fixes
    /// the record id before any I/O can happen.
    fn resolve(
        &mut self,
        forced: Option<Verdict>,
        via: ResolvedVia,
        now_ms: u64,
        tie: &mut dyn TieBreak,
    ) -> Event {
        let result = forced
            .unwrap_or_else(|| policy::resolve(self.draft.pros().len(), self.draft.cons().len(), tie));
        self.pending = Some(PendingOutcome {
            record_id: Uuid::new_v4().to_string(),
            result,
            via,
            resolved_at_ms: now_ms,
            saved: false,
            snapshot_cleared: false,
        });
        self.phase = Phase::Resolved;
        Event::DecisionResolved {
            result,
            via,
            at: Utc::now(),
        }
    }

    // ── Finalization ─────────────────────────────────────────────────

    /// Write the decision record and clear the in-progress snapshot.
    ///
    /// Idempotent: safe to call again after a failure (the store is
    /// idempotent by record id) and after success (no-op). Never re-runs
    /// the resolution policy.
    ///
    /// A failed snapshot clear after the record write landed does not fail
    /// the call: the verdict is durable, so the event is returned and the
    /// engine parks with [`needs_snapshot_clear`](Self::needs_snapshot_clear)
    /// set. The next call retries only the clear.
    pub fn finalize(
        &mut self,
        user_id: &str,
        records: &dyn RecordStore,
        snapshots: &dyn SnapshotStore,
    ) -> Result<Event> {
        let Some(pending) = self.pending.as_ref() else {
            return Err(TransitionError::NotResolved.into());
        };
        if !pending.saved {
            let record = self.build_record(user_id, pending);
            records.persist(&record)?;
            if let Some(p) = self.pending.as_mut() {
                p.saved = true;
            }
        }
        if self.needs_snapshot_clear() && snapshots.clear(user_id).is_ok() {
            if let Some(p) = self.pending.as_mut() {
                p.snapshot_cleared = true;
            }
        }
        let pending = self.pending.as_ref().ok_or(TransitionError::NotResolved)?;
        Ok(Event::RecordSaved {
            record_id: pending.record_id.clone(),
            result: pending.result,
            at: Utc::now(),
        })
    }

    fn build_record(&self, user_id: &str, pending: &PendingOutcome) -> DecisionRecord {
        DecisionRecord {
            id: pending.record_id.clone(),
            user_id: user_id.to_string(),
            question: self.draft.question().to_string(),
            pros: self.draft.pros().to_vec(),
            cons: self.draft.cons().to_vec(),
            result: pending.result,
            created_at_ms: pending.resolved_at_ms,
            locked_until_ms: pending.resolved_at_ms.saturating_add(self.rating_lock_ms),
            outcome: Outcome::Pending,
            time_saved_min: time_saved_min(self.draft.timer_duration_secs()),
        }
    }
}

/// Configured duration in whole minutes for stats, never less than 1.
fn time_saved_min(duration_secs: u64) -> u64 {
    duration_secs.div_ceil(60).max(1)
}
