//! Worker error types.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use parkwatch_analytics::AnalyticsError;
use parkwatch_ml::MlError;
use parkwatch_models::{InvalidVideoId, VideoId};
use parkwatch_storage::StorageError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Step of a video run, reported with every stage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    LoadInputs,
    MotionAggregation,
    FeatureMerge,
    Prediction,
    Summaries,
    CongestionDetection,
    Persist,
    CorpusUpdate,
    Training,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::LoadInputs => "load_inputs",
            Stage::MotionAggregation => "motion_aggregation",
            Stage::FeatureMerge => "feature_merge",
            Stage::Prediction => "prediction",
            Stage::Summaries => "summaries",
            Stage::CongestionDetection => "congestion_detection",
            Stage::Persist => "persist",
            Stage::CorpusUpdate => "corpus_update",
            Stage::Training => "training",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure classes surfaced to hosting applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A raw record is malformed or misses a field
    InputFormat,
    /// A raw input table or the model artifact is absent
    MissingResource,
    /// The labeled corpus cannot be split for training
    StatisticalDegeneracy,
    InvalidVideoId,
    Configuration,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InputFormat => "input_format",
            ErrorKind::MissingResource => "missing_resource",
            ErrorKind::StatisticalDegeneracy => "statistical_degeneracy",
            ErrorKind::InvalidVideoId => "invalid_video_id",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Stage {stage} failed for video {video}: {source}")]
    StageFailed {
        video: VideoId,
        stage: Stage,
        #[source]
        source: Box<WorkerError>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid video id: {0}")]
    InvalidVideoId(#[from] InvalidVideoId),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Analytics error: {0}")]
    Analytics(#[from] AnalyticsError),

    #[error("Classifier error: {0}")]
    Ml(#[from] MlError),

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn task_failed(msg: impl Into<String>) -> Self {
        Self::TaskFailed(msg.into())
    }

    /// Wrap `self` with the video and stage it failed in.
    pub fn in_stage(self, video: &VideoId, stage: Stage) -> Self {
        Self::StageFailed {
            video: video.clone(),
            stage,
            source: Box::new(self),
        }
    }

    /// Stage the error was raised in, if known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            WorkerError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Innermost error, below any stage wrappers.
    pub fn root(&self) -> &WorkerError {
        match self {
            WorkerError::StageFailed { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            WorkerError::Storage(StorageError::NotFound(_)) => ErrorKind::MissingResource,
            WorkerError::Storage(StorageError::InputFormat { .. }) => ErrorKind::InputFormat,
            WorkerError::Storage(_) => ErrorKind::Internal,
            WorkerError::Analytics(AnalyticsError::InputFormat { .. }) => ErrorKind::InputFormat,
            WorkerError::Analytics(AnalyticsError::InvalidConfig(_)) => ErrorKind::Configuration,
            WorkerError::Ml(MlError::StatisticalDegeneracy(_)) => ErrorKind::StatisticalDegeneracy,
            // An artifact the pipeline cannot use counts as absent
            WorkerError::Ml(MlError::IncompatibleModel(_)) => ErrorKind::MissingResource,
            WorkerError::Ml(MlError::InvalidConfig(_)) => ErrorKind::Configuration,
            WorkerError::ConfigError(_) => ErrorKind::Configuration,
            WorkerError::InvalidVideoId(_) => ErrorKind::InvalidVideoId,
            WorkerError::TaskFailed(_) | WorkerError::StageFailed { .. } => ErrorKind::Internal,
        }
    }

    /// Check if a later retry of the same call can succeed without
    /// changing the inputs.
    pub fn is_retryable(&self) -> bool {
        match self.root() {
            WorkerError::Storage(StorageError::Io(_)) | WorkerError::TaskFailed(_) => true,
            other => other.kind() == ErrorKind::MissingResource,
        }
    }
}

/// Attach a video and stage to a fallible step.
pub trait StageContext<T> {
    fn stage(self, video: &VideoId, stage: Stage) -> WorkerResult<T>;
}

impl<T, E> StageContext<T> for Result<T, E>
where
    E: Into<WorkerError>,
{
    fn stage(self, video: &VideoId, stage: Stage) -> WorkerResult<T> {
        self.map_err(|e| e.into().in_stage(video, stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video() -> VideoId {
        VideoId::new("plaza").unwrap()
    }

    #[test]
    fn test_stage_failure_keeps_root_kind() {
        let err: WorkerResult<()> =
            Err(StorageError::not_found("motion file")).stage(&video(), Stage::LoadInputs);
        let err = err.unwrap_err();

        assert_eq!(err.stage(), Some(Stage::LoadInputs));
        assert_eq!(err.kind(), ErrorKind::MissingResource);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("load_inputs"));
        assert!(err.to_string().contains("plaza"));
    }

    #[test]
    fn test_degeneracy_is_not_retryable() {
        let err =
            WorkerError::from(MlError::degenerate("one class")).in_stage(&video(), Stage::Training);
        assert_eq!(err.kind(), ErrorKind::StatisticalDegeneracy);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_input_format_kinds() {
        let storage =
            WorkerError::from(StorageError::input_format("a.csv", 3, "second", "not a number"));
        assert_eq!(storage.kind(), ErrorKind::InputFormat);

        let analytics = WorkerError::from(AnalyticsError::input_format("plaza", "NaN ratio"));
        assert_eq!(analytics.kind(), ErrorKind::InputFormat);
        assert!(!analytics.is_retryable());
    }

    #[test]
    fn test_incompatible_model_counts_as_missing() {
        let err = WorkerError::from(MlError::IncompatibleModel("feature order".into()));
        assert_eq!(err.kind(), ErrorKind::MissingResource);
    }
}
