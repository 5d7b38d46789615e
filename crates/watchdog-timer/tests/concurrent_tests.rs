//! Concurrency tests for the watchdog timer.

mod common;

use common::{FireCounter, TestResult, wait_until};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use watchdog_timer::prelude::*;

#[test]
fn test_concurrent_clears_keep_timer_alive() -> TestResult {
    let fired = FireCounter::new();
    let timer = Arc::new(WatchdogTimer::new());
    timer.on_timeout(fired.callback());
    timer.kick(Duration::from_millis(200), false)?;

    let mut handles = vec![];
    for _ in 0..4 {
        let timer_clone = Arc::clone(&timer);
        let handle = thread::spawn(move || {
            for _ in 0..50 {
                timer_clone.clear();
                thread::sleep(Duration::from_millis(10));
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        assert!(handle.join().is_ok(), "Thread should not panic");
    }

    assert_eq!(fired.get(), 0);
    assert!(timer.is_running());
    assert_eq!(timer.stats().clears, 200);

    timer.stop()?;
    Ok(())
}

#[test]
fn test_concurrent_stops_all_wait_for_exit() -> TestResult {
    let in_callback = Arc::new(AtomicBool::new(false));
    let timer = Arc::new(WatchdogTimer::new());

    let flag = Arc::clone(&in_callback);
    timer.on_timeout(move || {
        flag.store(true, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(80));
        flag.store(false, Ordering::SeqCst);
    });
    timer.kick(Duration::ZERO, true)?;
    assert!(wait_until(Duration::from_secs(2), || {
        in_callback.load(Ordering::SeqCst)
    }));

    let mut handles = vec![];
    for _ in 0..6 {
        let timer_clone = Arc::clone(&timer);
        let flag = Arc::clone(&in_callback);
        let handle = thread::spawn(move || {
            let stopped = timer_clone.stop().is_ok();
            // Every caller returns only after the callback has finished.
            stopped && !flag.load(Ordering::SeqCst) && !timer_clone.is_running()
        });
        handles.push(handle);
    }

    for handle in handles {
        let ok = handle.join().map_err(|_| "stop thread panicked")?;
        assert!(ok);
    }

    assert_eq!(timer.stats().stops, 1);
    Ok(())
}

#[test]
fn test_concurrent_kicks_leave_single_worker() -> TestResult {
    let fired = FireCounter::new();
    let timer = Arc::new(WatchdogTimer::new());
    timer.on_timeout(fired.callback());

    let mut handles = vec![];
    for _ in 0..8 {
        let timer_clone = Arc::clone(&timer);
        let handle = thread::spawn(move || {
            for _ in 0..10 {
                if timer_clone.kick(Duration::from_millis(300), false).is_err() {
                    return false;
                }
            }
            true
        });
        handles.push(handle);
    }

    for handle in handles {
        let ok = handle.join().map_err(|_| "kick thread panicked")?;
        assert!(ok);
    }

    assert!(timer.is_running());
    assert!(wait_until(Duration::from_secs(3), || !timer.is_running()));
    thread::sleep(Duration::from_millis(100));

    // Each kick replaced the previous worker before its deadline.
    assert_eq!(fired.get(), 1);
    assert_eq!(timer.stats().kicks, 80);
    Ok(())
}

#[test]
fn test_concurrent_kick_and_stop() -> TestResult {
    let timer = Arc::new(WatchdogTimer::new());
    let mut handles = vec![];

    for i in 0..4 {
        let timer_clone = Arc::clone(&timer);
        let handle = thread::spawn(move || {
            for _ in 0..25 {
                let result = if i % 2 == 0 {
                    timer_clone.kick(Duration::from_secs(10), true)
                } else {
                    timer_clone.stop()
                };
                if result.is_err() {
                    return false;
                }
            }
            true
        });
        handles.push(handle);
    }

    for handle in handles {
        let ok = handle.join().map_err(|_| "control thread panicked")?;
        assert!(ok);
    }

    timer.stop()?;
    assert!(!timer.is_running());
    assert_eq!(timer.remaining(), None);
    Ok(())
}

#[test]
fn test_stats_readable_while_looping() -> TestResult {
    let fired = FireCounter::new();
    let timer = Arc::new(WatchdogTimer::new());
    timer.on_timeout(fired.callback());
    timer.kick(Duration::from_millis(5), true)?;

    let mut handles = vec![];
    for _ in 0..4 {
        let timer_clone = Arc::clone(&timer);
        let handle = thread::spawn(move || {
            let mut last = 0;
            for _ in 0..100 {
                let stats = timer_clone.stats();
                if stats.timeouts < last {
                    return false;
                }
                last = stats.timeouts;
                thread::sleep(Duration::from_micros(200));
            }
            true
        });
        handles.push(handle);
    }

    for handle in handles {
        let ok = handle.join().map_err(|_| "reader thread panicked")?;
        assert!(ok, "timeout counter went backwards");
    }

    timer.stop()?;
    assert_eq!(u64::from(fired.get()), timer.stats().timeouts);
    Ok(())
}
