//! The watchdog timer and its worker loop.
//!
//! A [`WatchdogTimer`] owns at most one worker thread. The worker sleeps on a
//! condition variable until the configured timeout has elapsed since the last
//! reset, re-checking the clock on every wake, and then runs the timeout
//! callback on its own thread.
//!
//! # Synchronization
//!
//! All run state (baseline, timeout, loop mode, run epoch, counters) lives
//! under one `parking_lot::Mutex` shared with the worker. `kick` and `stop`
//! advance the run epoch and broadcast on the condition variable; a worker
//! exits as soon as the epoch differs from the one it is serving. Joins are
//! serialised by a second lock around the worker handle, which the worker
//! itself never takes.

use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use crate::clock::{Clock, MonotonicClock, SystemClock};
use crate::config::TimerConfig;
use crate::error::{TimerError, TimerResult};
use crate::stats::TimerStats;

/// Callback invoked on the worker thread when the timer expires.
pub type TimeoutCallback = Arc<dyn Fn() + Send + Sync>;

/// Watchdog timer measured against [`MonotonicClock`].
pub type HighResolutionWatchdogTimer = WatchdogTimer<MonotonicClock>;

/// Watchdog timer measured against the wall clock.
pub type SystemClockWatchdogTimer = WatchdogTimer<SystemClock>;

struct RunState<I> {
    baseline: I,
    timeout: Duration,
    loop_mode: bool,
    /// Advanced by every kick and stop. A worker serves exactly one epoch.
    epoch: u64,
    /// Thread id of the live worker, recorded by the worker itself.
    worker: Option<ThreadId>,
    /// Set by a kick issued from inside the callback.
    rearmed: bool,
    /// Set while another thread is joining the worker.
    stopping: bool,
    /// Advanced whenever the baseline moves.
    resets: u64,
    stats: TimerStats,
}

struct Shared<C: Clock> {
    clock: C,
    state: Mutex<RunState<C::Instant>>,
    wakeup: Condvar,
    running: AtomicBool,
    callback: RwLock<Option<TimeoutCallback>>,
}

/// A watchdog timer that fires a callback when it is not reset in time.
///
/// # Lifecycle
///
/// The timer starts idle. [`kick`](Self::kick) starts a worker thread,
/// [`clear`](Self::clear) resets the elapsed-time baseline, and
/// [`stop`](Self::stop) halts and joins the worker. Dropping the timer stops
/// it.
///
/// # Callback
///
/// The callback registered with [`on_timeout`](Self::on_timeout) runs on the
/// worker thread with no internal lock held, so it may call `clear`, `kick`
/// or `stop` on the same timer. `stop` from the callback only signals the
/// worker and returns; `kick` from the callback re-arms the same worker.
///
/// A panic in the callback is not caught: it ends the worker and leaves the
/// timer idle, in loop mode as well. Callers that need to keep watching must
/// handle failures inside their callback.
///
/// # Example
///
/// ```rust
/// use watchdog_timer::WatchdogTimer;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
///
/// let fired = Arc::new(AtomicU32::new(0));
/// let timer = WatchdogTimer::new();
///
/// let counter = Arc::clone(&fired);
/// timer.on_timeout(move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// timer.kick(Duration::from_millis(10), false)?;
/// std::thread::sleep(Duration::from_millis(100));
/// timer.stop()?;
///
/// assert_eq!(fired.load(Ordering::SeqCst), 1);
/// # Ok::<(), watchdog_timer::TimerError>(())
/// ```
pub struct WatchdogTimer<C: Clock = MonotonicClock> {
    shared: Arc<Shared<C>>,
    config: TimerConfig,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WatchdogTimer<MonotonicClock> {
    /// Create an idle timer on the monotonic clock with the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock)
    }
}

impl Default for WatchdogTimer<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> WatchdogTimer<C> {
    /// Create an idle timer measuring time with `clock`.
    #[must_use]
    pub fn with_clock(clock: C) -> Self {
        Self::build(clock, TimerConfig::default())
    }

    /// Create an idle timer with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_config(clock: C, config: TimerConfig) -> TimerResult<Self> {
        config.validate()?;
        Ok(Self::build(clock, config))
    }

    fn build(clock: C, config: TimerConfig) -> Self {
        let state = RunState {
            baseline: clock.now(),
            timeout: config.timeout,
            loop_mode: config.loop_mode,
            epoch: 0,
            worker: None,
            rearmed: false,
            stopping: false,
            resets: 0,
            stats: TimerStats::default(),
        };

        Self {
            shared: Arc::new(Shared {
                clock,
                state: Mutex::new(state),
                wakeup: Condvar::new(),
                running: AtomicBool::new(false),
                callback: RwLock::new(None),
            }),
            config,
            worker: Mutex::new(None),
        }
    }

    /// Register the timeout callback, replacing any previous one.
    pub fn on_timeout<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.shared.callback.write() = Some(Arc::new(callback));
    }

    /// Remove the timeout callback. A running timer keeps counting timeouts.
    pub fn clear_on_timeout(&self) {
        *self.shared.callback.write() = None;
    }

    /// Check whether a timeout callback is registered.
    #[must_use]
    pub fn has_on_timeout(&self) -> bool {
        self.shared.callback.read().is_some()
    }

    /// Start or restart the timer.
    ///
    /// Any running worker is stopped and joined first, then a new worker
    /// starts with `timeout` and `loop_mode`. A zero timeout fires
    /// immediately.
    ///
    /// Called from inside the timeout callback, the current worker is re-armed
    /// with the new parameters instead of being replaced.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::Spawn`] if the worker thread cannot be started,
    /// or [`TimerError::StopInProgress`] when called from the callback while
    /// another thread is stopping the timer.
    pub fn kick(&self, timeout: Duration, loop_mode: bool) -> TimerResult<()> {
        if let Some(result) = self.rearm_from_worker(timeout, loop_mode) {
            return result;
        }

        let mut slot = self.worker.lock();
        if let Some(err) = self.halt(&mut slot) {
            tracing::error!(error = %err, "Previous watchdog worker ended abnormally");
        }

        let epoch = {
            let mut state = self.shared.state.lock();
            state.epoch = state.epoch.wrapping_add(1);
            state.baseline = self.shared.clock.now();
            state.resets = state.resets.wrapping_add(1);
            state.timeout = timeout;
            state.loop_mode = loop_mode;
            state.rearmed = false;
            self.shared.running.store(true, Ordering::Release);
            state.epoch
        };

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || run_worker(&shared, epoch));

        match spawned {
            Ok(handle) => {
                *slot = Some(handle);
                self.shared.state.lock().stats.record_kick();
                tracing::debug!(
                    thread = %self.config.thread_name,
                    timeout = ?timeout,
                    loop_mode,
                    "Watchdog kicked"
                );
                Ok(())
            }
            Err(err) => {
                self.shared.running.store(false, Ordering::Release);
                Err(TimerError::Spawn(err))
            }
        }
    }

    /// Start or restart the timer with a timeout in milliseconds.
    ///
    /// # Errors
    ///
    /// See [`kick`](Self::kick).
    pub fn kick_ms(&self, timeout_ms: u64, loop_mode: bool) -> TimerResult<()> {
        self.kick(Duration::from_millis(timeout_ms), loop_mode)
    }

    /// Start or restart the timer with the configured timeout and loop mode.
    ///
    /// # Errors
    ///
    /// See [`kick`](Self::kick).
    pub fn kick_with_config(&self) -> TimerResult<()> {
        self.kick(self.config.timeout, self.config.loop_mode)
    }

    /// Reset the elapsed-time baseline to now.
    ///
    /// Does not wake or restart the worker; it picks up the new baseline on
    /// its next check. Safe to call from any thread, including the callback.
    pub fn clear(&self) {
        let mut state = self.shared.state.lock();
        state.baseline = self.shared.clock.now();
        state.resets = state.resets.wrapping_add(1);
        state.stats.record_clear();
    }

    /// Stop the timer and wait for the worker to exit.
    ///
    /// A no-op on an idle timer. Called from inside the timeout callback it
    /// only signals the worker, which exits once the callback returns.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::CallbackPanicked`] if the joined worker was
    /// ended by a panicking callback.
    pub fn stop(&self) -> TimerResult<()> {
        if self.stop_from_worker() {
            return Ok(());
        }

        let mut slot = self.worker.lock();
        match self.halt(&mut slot) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Check whether a worker is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Timeout of the current or most recent run.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.shared.state.lock().timeout
    }

    /// Loop mode of the current or most recent run.
    #[must_use]
    pub fn is_looping(&self) -> bool {
        self.shared.state.lock().loop_mode
    }

    /// Time elapsed since the last kick, clear or loop re-arm.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        let state = self.shared.state.lock();
        self.shared.clock.elapsed_since(state.baseline)
    }

    /// Time left before the timer fires, or `None` if it is idle.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        let state = self.shared.state.lock();
        if !self.is_running() {
            return None;
        }
        let elapsed = self.shared.clock.elapsed_since(state.baseline);
        Some(state.timeout.saturating_sub(elapsed))
    }

    /// Snapshot of the activity counters.
    #[must_use]
    pub fn stats(&self) -> TimerStats {
        self.shared.state.lock().stats
    }

    /// Reset the activity counters.
    pub fn reset_stats(&self) {
        self.shared.state.lock().stats.reset();
    }

    /// The clock this timer measures against.
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.shared.clock
    }

    /// The timer's configuration.
    #[must_use]
    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Kick issued from the worker thread: re-arm in place.
    ///
    /// Returns `None` when the caller is not this timer's worker.
    fn rearm_from_worker(&self, timeout: Duration, loop_mode: bool) -> Option<TimerResult<()>> {
        let mut state = self.shared.state.lock();
        if state.worker != Some(thread::current().id()) {
            return None;
        }
        if state.stopping {
            return Some(Err(TimerError::StopInProgress));
        }

        state.epoch = state.epoch.wrapping_add(1);
        state.baseline = self.shared.clock.now();
        state.resets = state.resets.wrapping_add(1);
        state.timeout = timeout;
        state.loop_mode = loop_mode;
        state.rearmed = true;
        state.stats.record_kick();
        self.shared.running.store(true, Ordering::Release);

        tracing::debug!(timeout = ?timeout, loop_mode, "Watchdog re-armed from callback");
        Some(Ok(()))
    }

    /// Stop issued from the worker thread: signal only, never join.
    fn stop_from_worker(&self) -> bool {
        let mut state = self.shared.state.lock();
        if state.worker != Some(thread::current().id()) {
            return false;
        }

        state.epoch = state.epoch.wrapping_add(1);
        state.rearmed = false;
        if self.shared.running.swap(false, Ordering::AcqRel) {
            state.stats.record_stop();
        }

        tracing::debug!("Watchdog stopped from callback");
        true
    }

    /// Signal the worker in `slot` to exit and join it.
    ///
    /// Must be called with the worker lock held and never from the worker.
    fn halt(&self, slot: &mut Option<JoinHandle<()>>) -> Option<TimerError> {
        let handle = slot.take()?;

        {
            let mut state = self.shared.state.lock();
            state.epoch = state.epoch.wrapping_add(1);
            state.rearmed = false;
            state.stopping = true;
            if self.shared.running.swap(false, Ordering::AcqRel) {
                state.stats.record_stop();
            }
        }
        self.shared.wakeup.notify_all();

        let joined = handle.join();
        self.shared.state.lock().stopping = false;

        match joined {
            Ok(()) => {
                tracing::debug!("Watchdog worker joined");
                None
            }
            Err(payload) => Some(TimerError::callback_panicked(&*payload)),
        }
    }
}

impl<C: Clock> Drop for WatchdogTimer<C> {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::error!(error = %err, "Watchdog worker ended abnormally before drop");
        }
    }
}

impl<C: Clock + std::fmt::Debug> std::fmt::Debug for WatchdogTimer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("WatchdogTimer")
            .field("clock", &self.shared.clock)
            .field("config", &self.config)
            .field("running", &self.shared.running.load(Ordering::Acquire))
            .field("timeout", &state.timeout)
            .field("loop_mode", &state.loop_mode)
            .field("stats", &state.stats)
            .finish_non_exhaustive()
    }
}

/// Runs when the worker leaves its loop, including by unwinding out of a
/// panicking callback.
struct WorkerExit<'a, C: Clock> {
    shared: &'a Shared<C>,
    epoch: u64,
}

impl<C: Clock> Drop for WorkerExit<'_, C> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        if state.worker == Some(thread::current().id()) {
            state.worker = None;
        }
        // The run this worker served ended on its own: the timer is idle.
        if state.epoch == self.epoch || state.rearmed {
            state.rearmed = false;
            self.shared.running.store(false, Ordering::Release);
        }

        if thread::panicking() {
            tracing::warn!("Watchdog timeout callback panicked, worker exiting");
        } else {
            tracing::debug!(epoch = self.epoch, "Watchdog worker exited");
        }
    }
}

fn run_worker<C: Clock>(shared: &Shared<C>, epoch: u64) {
    // Declared before the state guard so it drops after the guard unlocks.
    let mut exit = WorkerExit { shared, epoch };
    let mut state = shared.state.lock();
    state.worker = Some(thread::current().id());

    'run: loop {
        // `(timed_out, resets)` of the last wait, once the worker has slept.
        let mut last_wait: Option<(bool, u64)> = None;
        let elapsed = loop {
            if state.epoch != exit.epoch {
                break 'run;
            }

            let elapsed = shared.clock.elapsed_since(state.baseline);
            if elapsed >= state.timeout {
                break elapsed;
            }
            let resets = state.resets;
            if let Some((timed_out, _)) = last_wait.filter(|&(_, waited)| waited == resets) {
                // Woken before the clock agrees the window has passed, with
                // no reset since the wait began.
                state.stats.record_early_wake();
                tracing::trace!(
                    timed_out,
                    elapsed = ?elapsed,
                    timeout = ?state.timeout,
                    "Early wake, suspending again"
                );
            }

            let remaining = state.timeout.saturating_sub(elapsed);
            let timed_out = shared.wakeup.wait_for(&mut state, remaining).timed_out();
            last_wait = Some((timed_out, resets));
        };

        let overshoot = elapsed.saturating_sub(state.timeout);
        state.stats.record_timeout(overshoot);
        if state.loop_mode {
            state.baseline = shared.clock.now();
            state.resets = state.resets.wrapping_add(1);
        } else {
            // A one-shot run ends at the fire; a stop from here on has
            // nothing left to halt.
            shared.running.store(false, Ordering::Release);
        }
        tracing::debug!(elapsed = ?elapsed, loop_mode = state.loop_mode, "Watchdog timeout");

        // The lock is handed over on every fire, so a back-to-back loop with
        // no callback still lets `stop` and `clear` through.
        let callback = shared.callback.read().clone();
        MutexGuard::unlocked_fair(&mut state, || {
            if let Some(callback) = callback {
                callback();
            }
        });

        if state.rearmed {
            state.rearmed = false;
            exit.epoch = state.epoch;
            continue;
        }
        if state.epoch != exit.epoch || !state.loop_mode {
            break;
        }
    }

    drop(state);
}
