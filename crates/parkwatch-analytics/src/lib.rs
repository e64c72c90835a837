//! Pure computations of the ParkWatch pipeline.
//!
//! Everything in this crate is synchronous and side-effect free: inputs are
//! row slices, outputs are new rows. Persistence lives in `parkwatch-storage`
//! and sequencing in `parkwatch-worker`.

pub mod congestion;
pub mod error;
pub mod features;
pub mod motion;
pub mod summary;
pub mod utilization;

pub use congestion::{detect_congestion, CongestionConfig, CongestionDetector, GapPolicy};
pub use error::{AnalyticsError, AnalyticsResult};
pub use features::{merge_all, merge_partition, FeatureMerge};
pub use motion::{aggregate_motion, MOTION_DECIMALS};
pub use summary::{activity_distribution, crowd_statistics};
pub use utilization::{UtilizationLevel, UtilizationScore, VideoSummary};
