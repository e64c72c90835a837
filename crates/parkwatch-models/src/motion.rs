//! Motion samples and their per-second aggregates.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::table::TableRow;
use crate::video::VideoId;

/// One frame's motion measurement, produced by the external motion analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawMotionSample {
    /// Frame index within the video
    pub frame_index: u64,
    /// Timestamp of the frame in seconds (fractional values are floored)
    pub second: f64,
    /// Number of foreground pixels
    pub motion_pixel_count: u64,
    /// Foreground pixels divided by frame pixels
    pub motion_ratio: f64,
}

/// Motion statistics of one observed second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MotionSecondAggregate {
    pub video: VideoId,
    pub second: u32,
    pub avg_motion_ratio: f64,
    /// Population standard deviation (0 for a single sample)
    pub motion_std: f64,
    pub max_motion_ratio: f64,
    pub min_motion_ratio: f64,
    /// `max_motion_ratio - min_motion_ratio`
    pub motion_range: f64,
}

impl TableRow for MotionSecondAggregate {
    const TABLE: &'static str = "motion_aggregated";
    const COLUMNS: &'static [&'static str] = &[
        "video",
        "second",
        "avg_motion_ratio",
        "motion_std",
        "max_motion_ratio",
        "min_motion_ratio",
        "motion_range",
    ];
    type Key = (VideoId, u32);

    fn video(&self) -> &VideoId {
        &self.video
    }

    fn key(&self) -> Self::Key {
        (self.video.clone(), self.second)
    }
}
