//! Error types for Loopplay Core

use std::time::Duration;
use thiserror::Error;

/// Result type alias for engine and clock operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine error types
#[derive(Error, Debug)]
pub enum Error {
    // Clock errors
    #[error("Seek to {target:?} failed: {reason}")]
    SeekFailed { target: Duration, reason: String },

    #[error("Seek was superseded by a newer seek before it completed")]
    SeekCancelled,

    #[error("Playback clock is no longer available")]
    ClockUnavailable,

    // Engine errors
    #[error("State engine has shut down")]
    EngineClosed,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a seek failure
    pub fn seek_failed(target: Duration, reason: impl Into<String>) -> Self {
        Error::SeekFailed {
            target,
            reason: reason.into(),
        }
    }

    /// Returns true if retrying the operation may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::SeekFailed { .. })
    }

    /// Returns a stable error code for logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::SeekFailed { .. } => "SEEK_FAILED",
            Error::SeekCancelled => "SEEK_CANCELLED",
            Error::ClockUnavailable => "CLOCK_UNAVAILABLE",
            Error::EngineClosed => "ENGINE_CLOSED",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Serialization(_) => "SERIALIZATION",
            Error::Io(_) => "IO",
        }
    }
}
