//! Classifier error types.

use thiserror::Error;

/// Result type for training and inference.
pub type MlResult<T> = Result<T, MlError>;

/// Errors that can occur while training or applying a classifier.
#[derive(Debug, Error)]
pub enum MlError {
    #[error("Statistically degenerate training data: {0}")]
    StatisticalDegeneracy(String),

    #[error("Incompatible model artifact: {0}")]
    IncompatibleModel(String),

    #[error("Invalid training configuration: {0}")]
    InvalidConfig(String),
}

impl MlError {
    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::StatisticalDegeneracy(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, MlError::StatisticalDegeneracy(_))
    }
}
