use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{Phase, ResolvedVia};
use crate::policy::Verdict;

/// Every state change in the engine produces an Event.
/// Drivers (CLI, GUI) print or forward them; nothing subscribes in-process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    CountdownStarted {
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    CountdownExtended {
        bonus_secs: u64,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    /// The verdict is fixed from this point on; persistence may still be
    /// pending (see `RecordSaved`).
    DecisionResolved {
        result: Verdict,
        via: ResolvedVia,
        at: DateTime<Utc>,
    },
    /// The final record write succeeded and the local snapshot was cleared.
    RecordSaved {
        record_id: String,
        result: Verdict,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        question: String,
        pros: Vec<String>,
        cons: Vec<String>,
        remaining_ms: u64,
        pause_used: bool,
        at: DateTime<Utc>,
    },
}
