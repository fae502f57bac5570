//! Error types for the icsync core.

use thiserror::Error;

/// Errors that can occur while building or encoding calendar data.
#[derive(Error, Debug)]
pub enum IcsError {
    #[error("Invalid event '{summary}': {reason}")]
    InvalidEvent { summary: String, reason: String },

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Invalid date/time value: {0}")]
    InvalidDateTime(String),
}

impl IcsError {
    pub(crate) fn invalid_event(summary: &str, reason: impl Into<String>) -> Self {
        IcsError::InvalidEvent {
            summary: summary.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for icsync core operations.
pub type IcsResult<T> = Result<T, IcsError>;
