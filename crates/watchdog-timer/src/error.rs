//! Error types for the watchdog timer.
//!
//! Most misuse of the timer (clearing or stopping an idle timer) is defined
//! as a no-op, so the error surface is small: thread spawning, configuration,
//! a callback that panicked on the worker thread, and the one race a kick
//! issued from inside the callback can lose.

use thiserror::Error;

/// Errors that can occur during watchdog timer operations.
#[derive(Debug, Error)]
pub enum TimerError {
    /// The operating system refused to start the worker thread.
    #[error("Failed to spawn watchdog worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The timeout callback panicked and took the worker down with it.
    #[error("Timeout callback panicked: {message}")]
    CallbackPanicked {
        /// The panic payload, when it was a string.
        message: String,
    },

    /// A kick from inside the callback raced a `stop` issued by another thread.
    #[error("Watchdog is being stopped by another thread")]
    StopInProgress,
}

impl TimerError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration(reason.into())
    }

    /// Create a callback panicked error from a thread's panic payload.
    #[must_use]
    pub fn callback_panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::CallbackPanicked { message }
    }
}

/// A specialized `Result` type for watchdog timer operations.
pub type TimerResult<T> = std::result::Result<T, TimerError>;
