//! Person counts and the crowd-level tables derived from them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::table::TableRow;
use crate::video::VideoId;

/// Number of people detected during one observed second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PersonCountSample {
    pub video: VideoId,
    pub second: u32,
    pub people_count: u32,
}

impl PersonCountSample {
    pub fn new(video: VideoId, second: u32, people_count: u32) -> Self {
        Self {
            video,
            second,
            people_count,
        }
    }
}

/// Per-video crowd summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CrowdStatistics {
    pub video: VideoId,
    /// Mean people count over observed seconds, 2 dp
    pub avg_people: f64,
    pub max_people: u32,
    /// First second at which `max_people` was observed
    pub peak_second: u32,
}

impl TableRow for CrowdStatistics {
    const TABLE: &'static str = "crowd_statistics";
    const COLUMNS: &'static [&'static str] = &["video", "avg_people", "max_people", "peak_second"];
    type Key = VideoId;

    fn video(&self) -> &VideoId {
        &self.video
    }

    fn key(&self) -> Self::Key {
        self.video.clone()
    }
}

/// A maximal run of qualifying person-count samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CongestionWindow {
    pub video: VideoId,
    pub start_second: u32,
    /// Last qualifying second of the run
    pub end_second: u32,
    /// Number of qualifying samples in the run
    pub duration_seconds: u32,
    pub max_people: u32,
}

impl TableRow for CongestionWindow {
    const TABLE: &'static str = "congestion_windows";
    const COLUMNS: &'static [&'static str] = &[
        "video",
        "start_second",
        "end_second",
        "duration_seconds",
        "max_people",
    ];
    type Key = (VideoId, u32);

    fn video(&self) -> &VideoId {
        &self.video
    }

    fn key(&self) -> Self::Key {
        (self.video.clone(), self.start_second)
    }
}
