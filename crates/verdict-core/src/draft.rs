//! Mutable decision draft and its validation rules.
//!
//! A draft is owned exclusively by the [`DecisionEngine`](crate::engine::DecisionEngine)
//! and is only user-mutable before the countdown starts. All list invariants
//! (capacity, entry length, starred index bounds) are enforced at the
//! mutating call; the one exception is starred-index invalidation on
//! removal, which is auto-cleared rather than rejected.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::policy::Side;

/// Maximum entries per side.
pub const MAX_ENTRIES: usize = 5;
/// Maximum characters per entry.
pub const MAX_ENTRY_LEN: usize = 100;

/// The in-progress decision: question, weighted arguments, timer settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionDraft {
    question: String,
    pros: Vec<String>,
    cons: Vec<String>,
    /// Advisory highlight; never consulted by the resolution policy.
    #[serde(default)]
    starred_pro: Option<usize>,
    #[serde(default)]
    starred_con: Option<usize>,
    /// Effective duration in seconds. Includes the extension bonus once
    /// `pause_used` is set.
    timer_duration_secs: u64,
    /// Wall-clock start, epoch milliseconds. Set once by `start`.
    started_at_ms: Option<u64>,
    /// One-way flag: the one-time extension has been consumed.
    pause_used: bool,
}

impl DecisionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn pros(&self) -> &[String] {
        &self.pros
    }

    pub fn cons(&self) -> &[String] {
        &self.cons
    }

    pub fn starred(&self, side: Side) -> Option<usize> {
        match side {
            Side::Pro => self.starred_pro,
            Side::Con => self.starred_con,
        }
    }

    pub fn timer_duration_secs(&self) -> u64 {
        self.timer_duration_secs
    }

    pub fn started_at_ms(&self) -> Option<u64> {
        self.started_at_ms
    }

    pub fn pause_used(&self) -> bool {
        self.pause_used
    }

    // ── Mutations (engine-gated: legal only before the countdown) ────

    pub fn set_question(&mut self, text: &str) -> Result<(), ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyQuestion);
        }
        self.question = text.to_string();
        Ok(())
    }

    pub fn add(&mut self, side: Side, text: &str) -> Result<(), ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyEntry { side });
        }
        if text.chars().count() > MAX_ENTRY_LEN {
            return Err(ValidationError::EntryTooLong {
                side,
                max: MAX_ENTRY_LEN,
            });
        }
        let list = self.list_mut(side);
        if list.len() >= MAX_ENTRIES {
            return Err(ValidationError::ListFull {
                side,
                max: MAX_ENTRIES,
            });
        }
        list.push(text.to_string());
        Ok(())
    }

    pub fn remove(&mut self, side: Side, index: usize) -> Result<String, ValidationError> {
        let len = self.list(side).len();
        if index >= len {
            return Err(ValidationError::OutOfBounds { side, index, len });
        }
        let removed = self.list_mut(side).remove(index);
        // Keep the starred index pointing at the same entry, or clear it
        // if that entry is the one removed.
        let starred = match side {
            Side::Pro => &mut self.starred_pro,
            Side::Con => &mut self.starred_con,
        };
        *starred = match *starred {
            Some(s) if s == index => None,
            Some(s) if s > index => Some(s - 1),
            other => other,
        };
        Ok(removed)
    }

    pub fn star(&mut self, side: Side, index: Option<usize>) -> Result<(), ValidationError> {
        if let Some(i) = index {
            let len = self.list(side).len();
            if i >= len {
                return Err(ValidationError::OutOfBounds {
                    side,
                    index: i,
                    len,
                });
            }
        }
        match side {
            Side::Pro => self.starred_pro = index,
            Side::Con => self.starred_con = index,
        }
        Ok(())
    }

    /// Validate start preconditions and fix the wall-clock anchor.
    /// Called exactly once by the engine.
    pub(crate) fn commit(
        &mut self,
        duration_secs: u64,
        now_ms: u64,
    ) -> Result<(), ValidationError> {
        if self.question.trim().is_empty() {
            return Err(ValidationError::EmptyQuestion);
        }
        if self.pros.is_empty() && self.cons.is_empty() {
            return Err(ValidationError::NoArguments);
        }
        if duration_secs == 0 {
            return Err(ValidationError::ZeroDuration);
        }
        self.timer_duration_secs = duration_secs;
        self.started_at_ms = Some(now_ms);
        Ok(())
    }

    /// Consume the one-time extension: bump the effective duration.
    /// The engine checks `pause_used` before calling.
    pub(crate) fn apply_extension(&mut self, bonus_secs: u64) {
        self.timer_duration_secs = self.timer_duration_secs.saturating_add(bonus_secs);
        self.pause_used = true;
    }

    fn list(&self, side: Side) -> &Vec<String> {
        match side {
            Side::Pro => &self.pros,
            Side::Con => &self.cons,
        }
    }

    fn list_mut(&mut self, side: Side) -> &mut Vec<String> {
        match side {
            Side::Pro => &mut self.pros,
            Side::Con => &mut self.cons,
        }
    }
}
