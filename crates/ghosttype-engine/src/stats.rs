//! Session counters, reported once at shutdown.
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic session counters. Incremented only by their owning operations;
/// read-only everywhere else.
#[derive(Debug, Default)]
pub struct Stats {
    total_inputs: AtomicU64,
    suggestions_shown: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Qualifying key presses dispatched this session.
    pub total_inputs: u64,
    /// Suggestions rendered this session.
    pub suggestions_shown: u64,
}

impl Stats {
    /// Record one qualifying input.
    pub fn record_input(&self) {
        self.total_inputs.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one rendered suggestion.
    pub fn record_shown(&self) {
        self.suggestions_shown.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_inputs: self.total_inputs.load(Ordering::Relaxed),
            suggestions_shown: self.suggestions_shown.load(Ordering::Relaxed),
        }
    }
}
