//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! hosting binary installs a recorder.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::error::Stage;

pub mod names {
    pub const VIDEOS_PROCESSED: &str = "parkwatch_videos_processed_total";
    pub const STAGE_DURATION: &str = "parkwatch_stage_duration_seconds";
    pub const PSEUDO_LABELS_ADDED: &str = "parkwatch_pseudo_labels_added_total";
    pub const RETRAIN_TOTAL: &str = "parkwatch_retrain_total";
    pub const TRAINING_DURATION: &str = "parkwatch_training_duration_seconds";
}

/// Outcome label of `parkwatch_retrain_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrainResult {
    Trained,
    Skipped,
    Failed,
}

impl RetrainResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrainResult::Trained => "trained",
            RetrainResult::Skipped => "skipped",
            RetrainResult::Failed => "failed",
        }
    }
}

pub fn record_video_processed(success: bool) {
    let labels = [("status", if success { "success" } else { "error" }.to_string())];
    counter!(names::VIDEOS_PROCESSED, &labels).increment(1);
}

pub fn record_stage_duration(stage: Stage, duration: Duration) {
    let labels = [("stage", stage.as_str().to_string())];
    histogram!(names::STAGE_DURATION, &labels).record(duration.as_secs_f64());
}

pub fn record_pseudo_labels_added(rows: usize) {
    counter!(names::PSEUDO_LABELS_ADDED).increment(rows as u64);
}

pub fn record_retrain(result: RetrainResult) {
    let labels = [("outcome", result.as_str().to_string())];
    counter!(names::RETRAIN_TOTAL, &labels).increment(1);
}

pub fn record_training_duration(duration: Duration) {
    histogram!(names::TRAINING_DURATION).record(duration.as_secs_f64());
}
