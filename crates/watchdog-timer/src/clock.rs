//! Clock sources for the watchdog timer.
//!
//! The timer only needs two things from a clock: the current time point, and
//! the duration between two time points it handed out earlier. Anything that
//! can provide those is a valid [`Clock`].
//!
//! - [`MonotonicClock`] - `std::time::Instant`, the default
//! - [`SystemClock`] - wall-clock `SystemTime`
//! - [`ManualClock`] - advanced by hand, for deterministic tests

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};

/// A source of time points the watchdog measures elapsed time against.
pub trait Clock: Send + Sync + 'static {
    /// Time point type returned by [`Clock::now`].
    type Instant: Copy + Debug + Send + Sync + 'static;

    /// Current time point.
    fn now(&self) -> Self::Instant;

    /// Time elapsed from `earlier` to `later`.
    ///
    /// Must saturate to [`Duration::ZERO`] if `later` precedes `earlier`.
    fn duration_between(&self, earlier: Self::Instant, later: Self::Instant) -> Duration;

    /// Time elapsed from `earlier` until now.
    fn elapsed_since(&self, earlier: Self::Instant) -> Duration {
        self.duration_between(earlier, self.now())
    }
}

/// Monotonic high-resolution clock backed by [`Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn duration_between(&self, earlier: Instant, later: Instant) -> Duration {
        later.saturating_duration_since(earlier)
    }
}

/// Wall clock backed by [`SystemTime`].
///
/// If the system time steps backwards the elapsed time reads as zero until
/// the clock catches up again, which postpones a pending timeout rather than
/// firing it early.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = SystemTime;

    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn duration_between(&self, earlier: SystemTime, later: SystemTime) -> Duration {
        later.duration_since(earlier).unwrap_or(Duration::ZERO)
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// give another to the timer.
///
/// ```rust
/// use watchdog_timer::clock::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_millis(250));
/// assert_eq!(clock.elapsed_since(start), Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a manual clock starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `by`, saturating at `u64::MAX` nanoseconds.
    pub fn advance(&self, by: Duration) {
        let by = duration_to_nanos(by);
        let mut current = self.nanos.load(Ordering::Acquire);
        loop {
            match self.nanos.compare_exchange_weak(
                current,
                current.saturating_add(by),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Set the clock to an absolute offset from its origin.
    ///
    /// Setting it backwards is allowed; elapsed times saturate at zero.
    pub fn set(&self, since_origin: Duration) {
        self.nanos
            .store(duration_to_nanos(since_origin), Ordering::Release);
    }

    /// Current offset from the clock's origin.
    #[must_use]
    pub fn current(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Acquire))
    }
}

impl Clock for ManualClock {
    type Instant = Duration;

    fn now(&self) -> Duration {
        self.current()
    }

    fn duration_between(&self, earlier: Duration, later: Duration) -> Duration {
        later.saturating_sub(earlier)
    }
}

fn duration_to_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
