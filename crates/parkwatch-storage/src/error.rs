//! Storage error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading or writing tables and artifacts.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid input in {path} (line {line}), field '{field}': {reason}")]
    InputFormat {
        path: PathBuf,
        line: u64,
        field: String,
        reason: String,
    },

    #[error("Schema mismatch in {path}: expected columns {expected:?}, found {found:?}")]
    SchemaMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Duplicate key {key} in table {table}")]
    DuplicateKey { table: &'static str, key: String },

    #[error("Row of video {found} cannot be written to partition {expected} of table {table}")]
    ForeignRow {
        table: &'static str,
        expected: String,
        found: String,
    },

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn input_format(
        path: impl Into<PathBuf>,
        line: u64,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InputFormat {
            path: path.into(),
            line,
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    /// Referenced table, raw input or artifact is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    /// A raw record was malformed.
    pub fn is_input_format(&self) -> bool {
        matches!(self, StorageError::InputFormat { .. })
    }
}
