//! Shared data models for the ParkWatch analytics pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Video identifiers and activity labels
//! - Raw motion and person-count samples
//! - Every derived table row (features, predictions, summaries, congestion windows)
//! - The labeled training corpus
//! - Orchestrator outcomes returned to hosting applications

pub mod activity;
pub mod crowd;
pub mod features;
pub mod motion;
pub mod outcome;
pub mod report;
pub mod table;
pub mod utils;
pub mod video;

// Re-export common types
pub use activity::{ActivityLabel, ParseLabelError};
pub use crowd::{CongestionWindow, CrowdStatistics, PersonCountSample};
pub use features::{
    ActivityDistributionSummary, ActivityPrediction, FeatureRow, FeatureVector, LabeledTrainingRow,
    FEATURE_COUNT, FEATURE_NAMES,
};
pub use motion::{MotionSecondAggregate, RawMotionSample};
pub use outcome::{
    PartialUpdateWarning, ProcessOutcome, RebuildOutcome, RetrainOutcome, TrainOutcome,
};
pub use report::{ClassMetrics, ClassificationReport, FeatureImportance};
pub use table::TableRow;
pub use utils::round_to;
pub use video::{InvalidVideoId, VideoId};
