//! Prelude for watchdog-timer.
//!
//! This module re-exports the most commonly used types for convenient importing.
//!
//! # Example
//!
//! ```rust
//! use watchdog_timer::prelude::*;
//!
//! let timer = WatchdogTimer::with_clock(ManualClock::new());
//! timer.clear();
//! assert!(!timer.is_running());
//! ```

pub use crate::clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use crate::config::{TimerConfig, TimerConfigBuilder};
pub use crate::error::{TimerError, TimerResult};
pub use crate::stats::TimerStats;
pub use crate::timer::{
    HighResolutionWatchdogTimer, SystemClockWatchdogTimer, TimeoutCallback, WatchdogTimer,
};
