//! Analytics error types.

use thiserror::Error;

/// Result type for analytics computations.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Errors raised while deriving tables from raw samples.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Invalid input for {video}: {message}")]
    InputFormat { video: String, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AnalyticsError {
    pub fn input_format(video: impl ToString, message: impl Into<String>) -> Self {
        Self::InputFormat {
            video: video.to_string(),
            message: message.into(),
        }
    }

    pub fn is_input_format(&self) -> bool {
        matches!(self, AnalyticsError::InputFormat { .. })
    }
}
