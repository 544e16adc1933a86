//! Grading failures, categorized for the retry policy.

use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradingError {
    /// The evaluator could not be reached or refused the request for now.
    Unavailable { message: String },

    /// One grading attempt ran past the per-attempt timeout.
    Timeout { after: Duration },

    /// The request was withdrawn before a report was produced.
    Cancelled,

    /// The request itself is unusable (empty body, oversized input).
    InvalidArgument { message: String },

    Internal { message: String },
}

impl fmt::Display for GradingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { message } => write!(f, "grading service unavailable: {message}"),
            Self::Timeout { after } => {
                write!(f, "grading timed out after {}ms", after.as_millis())
            }
            Self::Cancelled => write!(f, "grading cancelled"),
            Self::InvalidArgument { message } => write!(f, "invalid grading request: {message}"),
            Self::Internal { message } => write!(f, "internal grading error: {message}"),
        }
    }
}

impl std::error::Error for GradingError {}

impl GradingError {
    /// Whether another attempt may succeed (transport failures, timeouts).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}
