//! Structured video logging utilities.
//!
//! Every orchestrator call logs through a [`VideoLogger`] so that events
//! carry the same `video_id` and `operation` fields.

use tracing::{error, info, warn, Span};

use parkwatch_models::VideoId;

use crate::error::Stage;

/// Logger for one orchestrator call on one video.
#[derive(Debug, Clone)]
pub struct VideoLogger {
    video_id: String,
    operation: String,
}

impl VideoLogger {
    /// # Arguments
    /// * `video` - The video being processed
    /// * `operation` - The entrypoint name (e.g., "process_new_video")
    pub fn new(video: &VideoId, operation: &str) -> Self {
        Self {
            video_id: video.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Video run started: {}", message
        );
    }

    /// Log the completion of one stage.
    pub fn log_stage(&self, stage: Stage, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            stage = %stage,
            "Stage done: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Video run warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Video run error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Video run completed: {}", message
        );
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "video",
            video_id = %self.video_id,
            operation = %self.operation
        )
    }
}
