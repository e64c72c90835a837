//! Results returned by the orchestrator entrypoints.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::features::ActivityDistributionSummary;
use crate::report::{ClassificationReport, FeatureImportance};
use crate::video::VideoId;

/// Result of `process_new_video`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProcessOutcome {
    pub video: VideoId,
    /// Feature rows written for the video
    pub rows_affected: usize,
    pub windows_found: usize,
    /// `None` when the video produced no feature rows
    pub prediction_summary: Option<ActivityDistributionSummary>,
}

/// Corpus was updated but retraining did not complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PartialUpdateWarning {
    pub video: VideoId,
    /// Pseudo-labeled rows that remain committed in the corpus
    pub rows_committed: usize,
    /// Error class of the failed retraining, e.g. `statistical_degeneracy`
    pub cause_kind: String,
    pub cause: String,
}

impl std::fmt::Display for PartialUpdateWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} pseudo-labeled rows for {} were committed but retraining failed: {}",
            self.rows_committed, self.video, self.cause
        )
    }
}

/// Result of `retrain_from_feedback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RetrainOutcome {
    pub video: VideoId,
    pub rows_added: usize,
    pub trained: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ClassificationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<PartialUpdateWarning>,
    /// Human-readable reason when `trained` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RetrainOutcome {
    /// No new rows survived deduplication; retraining was skipped.
    pub fn no_op(video: VideoId) -> Self {
        Self {
            video,
            rows_added: 0,
            trained: false,
            report: None,
            warning: None,
            reason: Some("No new pseudo-labeled rows were available".to_string()),
        }
    }
}

/// Result of training directly from the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrainOutcome {
    /// Labeled rows the split was drawn from
    pub labeled_rows: usize,
    pub report: ClassificationReport,
    pub feature_importance: Vec<FeatureImportance>,
}

/// Result of a full feature-store rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RebuildOutcome {
    /// Videos with raw motion or person-count inputs
    pub videos: usize,
    pub motion_rows: usize,
    pub feature_rows: usize,
}
