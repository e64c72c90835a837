//! Pipeline orchestrator for ParkWatch.
//!
//! This crate provides:
//! - `process_new_video`: the per-video stage chain with scoped upserts
//! - `retrain_from_feedback`: the self-training loop with partial-success reporting
//! - Initial training and full feature-store rebuild
//! - Pipeline configuration, structured video logging and metrics

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod self_training;

pub use config::{ClassifierMode, PipelineConfig};
pub use error::{ErrorKind, Stage, StageContext, WorkerError, WorkerResult};
pub use logging::VideoLogger;
pub use pipeline::Orchestrator;
pub use parkwatch_analytics::VideoSummary;
