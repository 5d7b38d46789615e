//! Watchdog timer statistics.
//!
//! Counters are updated under the timer's state lock and handed out as
//! snapshots, so a reader never sees a half-updated set.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Snapshot of a watchdog timer's activity counters.
///
/// All counters saturate instead of wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStats {
    /// Number of successful `kick` calls, including re-arms from the callback.
    pub kicks: u64,
    /// Number of `clear` calls.
    pub clears: u64,
    /// Number of times the timeout callback slot was invoked.
    pub timeouts: u64,
    /// Wakes where the clock showed less than the timeout had elapsed even
    /// though the baseline had not moved since the wait began.
    pub early_wakes: u64,
    /// Number of `stop` calls that halted a running worker.
    pub stops: u64,
    /// Largest observed lateness of a fire past its deadline.
    pub max_overshoot: Duration,
}

impl TimerStats {
    /// Create empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_kick(&mut self) {
        self.kicks = self.kicks.saturating_add(1);
    }

    pub(crate) fn record_clear(&mut self) {
        self.clears = self.clears.saturating_add(1);
    }

    pub(crate) fn record_timeout(&mut self, overshoot: Duration) {
        self.timeouts = self.timeouts.saturating_add(1);
        self.max_overshoot = self.max_overshoot.max(overshoot);
    }

    pub(crate) fn record_early_wake(&mut self) {
        self.early_wakes = self.early_wakes.saturating_add(1);
    }

    pub(crate) fn record_stop(&mut self) {
        self.stops = self.stops.saturating_add(1);
    }

    /// Share of wakes that turned out to be early, as a percentage.
    ///
    /// Returns 0.0 if the worker has not woken yet.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "wake counts stay far below 2^52"
    )]
    pub fn early_wake_rate(&self) -> f64 {
        let wakes = self.early_wakes.saturating_add(self.timeouts);
        if wakes == 0 {
            0.0
        } else {
            (self.early_wakes as f64 / wakes as f64) * 100.0
        }
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
