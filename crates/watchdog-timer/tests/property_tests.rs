//! Property-based tests for clock, configuration and timer invariants.

use proptest::prelude::*;
use std::time::Duration;
use watchdog_timer::prelude::*;

proptest! {
    #[test]
    fn test_manual_clock_elapsed_is_sum_of_advances(
        steps in prop::collection::vec(0..1_000_000u64, 0..50),
    ) {
        let clock = ManualClock::new();
        let start = clock.now();

        for step in &steps {
            clock.advance(Duration::from_micros(*step));
        }

        let expected: u64 = steps.iter().sum();
        prop_assert_eq!(clock.elapsed_since(start), Duration::from_micros(expected));
    }

    #[test]
    fn test_manual_clock_backwards_saturates(
        forward_ms in 0..10_000u64,
        back_ms in 0..10_000u64,
    ) {
        let clock = ManualClock::new();
        clock.set(Duration::from_millis(forward_ms));
        let reference = clock.now();
        clock.set(Duration::from_millis(forward_ms.saturating_sub(back_ms)));

        prop_assert_eq!(clock.elapsed_since(reference), Duration::ZERO);
    }

    #[test]
    fn test_config_accepts_printable_names(
        name in "[a-zA-Z0-9_-]{1,15}",
        timeout_ms in 1..100_000u64,
        loop_mode in any::<bool>(),
    ) {
        let config = TimerConfig::builder()
            .thread_name(name.clone())
            .timeout_ms(timeout_ms)
            .loop_mode(loop_mode)
            .build();

        prop_assert!(config.is_ok());
        if let Ok(config) = config {
            prop_assert_eq!(config.thread_name, name);
            prop_assert_eq!(config.timeout, Duration::from_millis(timeout_ms));
        }
    }

    #[test]
    fn test_config_rejects_nul_in_name(
        prefix in "[a-z]{0,8}",
        suffix in "[a-z]{0,8}",
    ) {
        let config = TimerConfig::builder()
            .thread_name(format!("{prefix}\0{suffix}"))
            .build();

        prop_assert!(matches!(config, Err(TimerError::InvalidConfiguration(_))));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_remaining_tracks_manual_clock(
        timeout_secs in 1..3_600u64,
        advance_fraction in 0.0..1.0f64,
    ) {
        let clock = ManualClock::new();
        let timer = WatchdogTimer::with_clock(clock.clone());
        let timeout = Duration::from_secs(timeout_secs);
        let advance = timeout.mul_f64(advance_fraction);

        prop_assert!(timer.kick(timeout, false).is_ok());
        clock.advance(advance);

        prop_assert_eq!(timer.elapsed(), advance);
        prop_assert_eq!(timer.remaining(), Some(timeout.saturating_sub(advance)));
        prop_assert_eq!(timer.stats().timeouts, 0);

        prop_assert!(timer.stop().is_ok());
        prop_assert!(!timer.is_running());
    }

    #[test]
    fn test_clear_count_matches_calls(clears in 0..200u64) {
        let timer = WatchdogTimer::with_clock(ManualClock::new());

        for _ in 0..clears {
            timer.clear();
        }

        prop_assert_eq!(timer.stats().clears, clears);
    }
}
