//! Video identifier.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum accepted length of a video id.
pub const MAX_VIDEO_ID_LENGTH: usize = 128;

/// Identifier of one analyzed video; the partition key of every table.
///
/// Ids double as file-name stems for the raw sample files, so only ASCII
/// alphanumerics, `_` and `-` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

/// Rejected video id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidVideoId {
    #[error("video id cannot be empty")]
    Empty,

    #[error("video id exceeds {MAX_VIDEO_ID_LENGTH} characters")]
    TooLong,

    #[error("video id '{0}' contains characters other than [A-Za-z0-9_-]")]
    InvalidCharacters(String),
}

impl VideoId {
    /// Validate and wrap a video id.
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidVideoId> {
        let id = id.into();
        if id.is_empty() {
            return Err(InvalidVideoId::Empty);
        }
        if id.len() > MAX_VIDEO_ID_LENGTH {
            return Err(InvalidVideoId::TooLong);
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(InvalidVideoId::InvalidCharacters(id));
        }
        Ok(Self(id))
    }

    /// Derive a valid id from an arbitrary name (e.g. an uploaded file stem).
    ///
    /// Disallowed characters become `_`, leading/trailing `_` are trimmed and
    /// an empty result falls back to `uploaded_video`.
    pub fn sanitized(name: &str) -> Self {
        let replaced: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let trimmed: String = replaced
            .trim_matches('_')
            .chars()
            .take(MAX_VIDEO_ID_LENGTH)
            .collect();
        if trimmed.is_empty() {
            Self("uploaded_video".to_string())
        } else {
            Self(trimmed)
        }
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VideoId {
    type Err = InvalidVideoId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for VideoId {
    type Error = InvalidVideoId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
