//! Feature table, predictions, training corpus and activity summaries.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::activity::ActivityLabel;
use crate::table::TableRow;
use crate::utils::deserialize_lenient_bool;
use crate::video::VideoId;

/// Number of model input features.
pub const FEATURE_COUNT: usize = 3;

/// Model input feature names, in the fixed order every model artifact expects.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = ["avg_motion_ratio", "motion_std", "people_count"];

/// Model input vector `[avg_motion_ratio, motion_std, people_count]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(avg_motion_ratio: f64, motion_std: f64, people_count: u32) -> Self {
        Self([avg_motion_ratio, motion_std, people_count as f64])
    }

    pub fn get(&self, feature: usize) -> f64 {
        self.0[feature]
    }

    pub fn avg_motion_ratio(&self) -> f64 {
        self.0[0]
    }
}

/// Canonical per-(video, second) feature row.
///
/// Missing motion or person data is stored as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeatureRow {
    pub video: VideoId,
    pub second: u32,
    pub avg_motion_ratio: f64,
    pub motion_std: f64,
    pub people_count: u32,
}

impl FeatureRow {
    pub fn features(&self) -> FeatureVector {
        FeatureVector::new(self.avg_motion_ratio, self.motion_std, self.people_count)
    }
}

impl TableRow for FeatureRow {
    const TABLE: &'static str = "master_dataset";
    const COLUMNS: &'static [&'static str] = &[
        "video",
        "second",
        "avg_motion_ratio",
        "motion_std",
        "people_count",
    ];
    type Key = (VideoId, u32);

    fn video(&self) -> &VideoId {
        &self.video
    }

    fn key(&self) -> Self::Key {
        (self.video.clone(), self.second)
    }
}

/// Feature row with the label assigned by a classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActivityPrediction {
    pub video: VideoId,
    pub second: u32,
    pub avg_motion_ratio: f64,
    pub motion_std: f64,
    pub people_count: u32,
    pub predicted_label: ActivityLabel,
}

impl ActivityPrediction {
    pub fn from_row(row: &FeatureRow, predicted_label: ActivityLabel) -> Self {
        Self {
            video: row.video.clone(),
            second: row.second,
            avg_motion_ratio: row.avg_motion_ratio,
            motion_std: row.motion_std,
            people_count: row.people_count,
            predicted_label,
        }
    }

    /// Candidate pseudo-labeled training row for this prediction.
    pub fn to_pseudo_label(&self) -> LabeledTrainingRow {
        LabeledTrainingRow {
            video: self.video.clone(),
            second: self.second,
            avg_motion_ratio: self.avg_motion_ratio,
            motion_std: self.motion_std,
            people_count: self.people_count,
            activity_label: Some(self.predicted_label),
            is_pseudo_label: true,
        }
    }
}

impl TableRow for ActivityPrediction {
    const TABLE: &'static str = "activity_ml_predictions";
    const COLUMNS: &'static [&'static str] = &[
        "video",
        "second",
        "avg_motion_ratio",
        "motion_std",
        "people_count",
        "predicted_label",
    ];
    type Key = (VideoId, u32);

    fn video(&self) -> &VideoId {
        &self.video
    }

    fn key(&self) -> Self::Key {
        (self.video.clone(), self.second)
    }
}

/// Row of the training corpus.
///
/// Rows without `activity_label` are kept in the corpus but ignored by
/// training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LabeledTrainingRow {
    pub video: VideoId,
    pub second: u32,
    pub avg_motion_ratio: f64,
    pub motion_std: f64,
    pub people_count: u32,
    #[serde(default)]
    pub activity_label: Option<ActivityLabel>,
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub is_pseudo_label: bool,
}

impl LabeledTrainingRow {
    pub fn features(&self) -> FeatureVector {
        FeatureVector::new(self.avg_motion_ratio, self.motion_std, self.people_count)
    }
}

impl TableRow for LabeledTrainingRow {
    const TABLE: &'static str = "master_labeled";
    const COLUMNS: &'static [&'static str] = &[
        "video",
        "second",
        "avg_motion_ratio",
        "motion_std",
        "people_count",
        "activity_label",
        "is_pseudo_label",
    ];
    type Key = (VideoId, u32);

    fn video(&self) -> &VideoId {
        &self.video
    }

    fn key(&self) -> Self::Key {
        (self.video.clone(), self.second)
    }
}

/// Share of each predicted activity within one video.
///
/// Percentages are rounded independently and need not sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActivityDistributionSummary {
    pub video: VideoId,
    pub sitting_percent: f64,
    pub walking_percent: f64,
    pub high_activity_percent: f64,
    pub dominant_activity: ActivityLabel,
}

impl ActivityDistributionSummary {
    pub fn percent_for(&self, label: ActivityLabel) -> f64 {
        match label {
            ActivityLabel::Sitting => self.sitting_percent,
            ActivityLabel::Walking => self.walking_percent,
            ActivityLabel::HighActivity => self.high_activity_percent,
        }
    }
}

impl TableRow for ActivityDistributionSummary {
    const TABLE: &'static str = "activity_distribution";
    const COLUMNS: &'static [&'static str] = &[
        "video",
        "sitting_percent",
        "walking_percent",
        "high_activity_percent",
        "dominant_activity",
    ];
    type Key = VideoId;

    fn video(&self) -> &VideoId {
        &self.video
    }

    fn key(&self) -> Self::Key {
        self.video.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_order_is_fixed() {
        let row = FeatureRow {
            video: VideoId::new("v1").unwrap(),
            second: 4,
            avg_motion_ratio: 0.01,
            motion_std: 0.002,
            people_count: 7,
        };
        assert_eq!(row.features().0, [0.01, 0.002, 7.0]);
        assert_eq!(FEATURE_NAMES, ["avg_motion_ratio", "motion_std", "people_count"]);
    }

    #[test]
    fn test_prediction_to_pseudo_label() {
        let row = FeatureRow {
            video: VideoId::new("v1").unwrap(),
            second: 2,
            avg_motion_ratio: 0.5,
            motion_std: 0.1,
            people_count: 3,
        };
        let prediction = ActivityPrediction::from_row(&row, ActivityLabel::Walking);
        let pseudo = prediction.to_pseudo_label();
        assert!(pseudo.is_pseudo_label);
        assert_eq!(pseudo.activity_label, Some(ActivityLabel::Walking));
        assert_eq!(pseudo.key(), row.key());
    }
}
