//! Activity label enumeration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Activity type assigned to a one-second window.
///
/// The declaration order is the total order used for every tie-break
/// (dominant label, feature-importance ranking of labels, report rows):
/// `Sitting < Walking < HighActivity`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLabel {
    Sitting,
    Walking,
    HighActivity,
}

/// Unknown activity label string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown activity label '{0}'")]
pub struct ParseLabelError(pub String);

impl ActivityLabel {
    /// All labels in tie-break order.
    pub const ALL: [ActivityLabel; 3] = [
        ActivityLabel::Sitting,
        ActivityLabel::Walking,
        ActivityLabel::HighActivity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sitting => "sitting",
            Self::Walking => "walking",
            Self::HighActivity => "high_activity",
        }
    }

    /// Position in [`ActivityLabel::ALL`]; used as a dense class index.
    pub fn index(&self) -> usize {
        match self {
            Self::Sitting => 0,
            Self::Walking => 1,
            Self::HighActivity => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for ActivityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActivityLabel {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "sitting" => Ok(Self::Sitting),
            "walking" => Ok(Self::Walking),
            "high_activity" => Ok(Self::HighActivity),
            other => Err(ParseLabelError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_strings() {
        for label in ActivityLabel::ALL {
            assert_eq!(label.as_str().parse::<ActivityLabel>().unwrap(), label);
            assert_eq!(ActivityLabel::from_index(label.index()), Some(label));
        }
        assert!("playing".parse::<ActivityLabel>().is_err());
    }

    #[test]
    fn test_tie_break_order() {
        assert!(ActivityLabel::Sitting < ActivityLabel::Walking);
        assert!(ActivityLabel::Walking < ActivityLabel::HighActivity);
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&ActivityLabel::HighActivity).unwrap();
        assert_eq!(json, "\"high_activity\"");
    }
}
