//! Wall-clock abstraction.
//!
//! The engine never reads the system clock itself -- callers pass epoch
//! milliseconds into time-dependent operations, and drivers (CLI, recovery)
//! obtain them from a [`Clock`]. This keeps elapsed time recomputable after
//! a suspend/resume gap and keeps tests deterministic.

/// Source of "now" in milliseconds since the Unix epoch.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Production clock backed by [`std::time::SystemTime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Manually-advanced clock for tests and simulations.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now_ms: std::cell::Cell<u64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: std::cell::Cell::new(start_ms),
        }
    }

    /// Move time forward by `delta_ms`.
    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.set(self.now_ms.get().saturating_add(delta_ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}
