//! Watchdog timer configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{TimerError, TimerResult};

/// Default name given to worker threads.
pub const DEFAULT_THREAD_NAME: &str = "watchdog-timer";

/// Configuration for a [`WatchdogTimer`](crate::WatchdogTimer).
///
/// `timeout` and `loop_mode` are only defaults for
/// [`kick_with_config`](crate::WatchdogTimer::kick_with_config); an explicit
/// `kick` always uses its own arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Name given to the worker thread.
    pub thread_name: String,
    /// Default timeout window.
    pub timeout: Duration,
    /// Re-arm automatically after each timeout.
    pub loop_mode: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            timeout: Duration::from_secs(1),
            loop_mode: false,
        }
    }
}

impl TimerConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread name is empty or contains a NUL byte,
    /// or if the default timeout is zero.
    pub fn validate(&self) -> TimerResult<()> {
        if self.thread_name.is_empty() {
            return Err(TimerError::invalid_configuration(
                "thread_name must not be empty",
            ));
        }
        if self.thread_name.contains('\0') {
            return Err(TimerError::invalid_configuration(
                "thread_name must not contain NUL bytes",
            ));
        }
        if self.timeout.is_zero() {
            return Err(TimerError::invalid_configuration(
                "timeout must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> TimerConfigBuilder {
        TimerConfigBuilder::default()
    }
}

/// Builder for `TimerConfig`.
#[derive(Debug, Default)]
pub struct TimerConfigBuilder {
    config: TimerConfig,
}

impl TimerConfigBuilder {
    /// Set the worker thread name.
    #[must_use]
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    /// Set the default timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the default timeout in milliseconds.
    #[must_use]
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout = Duration::from_millis(ms);
        self
    }

    /// Set whether the timer re-arms after each timeout.
    #[must_use]
    pub fn loop_mode(mut self, enabled: bool) -> Self {
        self.config.loop_mode = enabled;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> TimerResult<TimerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
