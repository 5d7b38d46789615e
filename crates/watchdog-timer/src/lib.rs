//! # watchdog-timer
//!
//! A watchdog timer that invokes a callback when it has not been kicked or
//! cleared within a configured timeout window.
//!
//! The monitored code only has to call [`WatchdogTimer::clear`] on every
//! heartbeat. A dedicated worker thread does the timing, and the timeout
//! callback runs there when a heartbeat is missed.
//!
//! ## Guarantees
//!
//! - **One worker per timer**: re-kicking joins the old worker before the new
//!   one starts
//! - **No premature fires**: every wake re-checks the clock, a timed or
//!   spurious wake alone never counts as a timeout
//! - **Callback-safe control**: `clear`, `kick` and `stop` may be called from
//!   the callback without deadlocking
//! - **No orphans**: dropping the timer stops and joins the worker
//!
//! ## Modules
//!
//! - [`timer`] - `WatchdogTimer` and its worker loop
//! - [`clock`] - the `Clock` capability and the bundled clocks
//! - [`config`] - timer configuration and builder
//! - [`stats`] - activity counters
//! - [`error`] - error types
//!
//! ## Example
//!
//! ```rust
//! use watchdog_timer::prelude::*;
//! use std::time::Duration;
//!
//! let timer = WatchdogTimer::new();
//! timer.on_timeout(|| eprintln!("heartbeat missed"));
//!
//! timer.kick(Duration::from_secs(5), true)?;
//! for _ in 0..3 {
//!     // ... do work, then report liveness
//!     timer.clear();
//! }
//! timer.stop()?;
//!
//! assert_eq!(timer.stats().timeouts, 0);
//! # Ok::<(), TimerError>(())
//! ```

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod clock;
pub mod config;
pub mod error;
pub mod stats;
pub mod timer;

pub mod prelude;

pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use config::{TimerConfig, TimerConfigBuilder};
pub use error::{TimerError, TimerResult};
pub use stats::TimerStats;
pub use timer::{
    HighResolutionWatchdogTimer, SystemClockWatchdogTimer, TimeoutCallback, WatchdogTimer,
};
