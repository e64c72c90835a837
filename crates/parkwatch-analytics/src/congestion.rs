//! Sustained-congestion detection over per-second person counts.
//!
//! # State Machine
//!
//! ```text
//!                   count >= people_threshold
//!     ┌──────────────────────────────────────────────┐
//!     │                                              ▼
//! ┌─────────┐                                   ┌────────┐
//! │ Outside │◄──────────────────────────────────│ Inside │──┐ count >= people_threshold
//! └─────────┘   count < people_threshold        └────────┘◄─┘ (length += 1)
//!               or end of input
//!               (emit if length >= duration_threshold)
//! ```
//!
//! The run length counts qualifying samples, not elapsed seconds. Under
//! [`GapPolicy::Tolerate`] a second with no sample does not end a run; only
//! an observed sub-threshold sample does.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use parkwatch_models::{CongestionWindow, PersonCountSample, VideoId};

use crate::error::{AnalyticsError, AnalyticsResult};

/// How a missing second inside a run is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Missing seconds are ignored; the run continues.
    #[default]
    Tolerate,
    /// A missing second closes the current run as if a sub-threshold sample
    /// had been observed.
    BreakOnMissingSecond,
}

impl std::str::FromStr for GapPolicy {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tolerate" => Ok(Self::Tolerate),
            "break" | "break_on_missing_second" => Ok(Self::BreakOnMissingSecond),
            other => Err(AnalyticsError::InvalidConfig(format!(
                "unknown congestion gap policy '{}'",
                other
            ))),
        }
    }
}

/// Thresholds of the congestion detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CongestionConfig {
    /// A sample qualifies when `people_count >= people_threshold`.
    pub people_threshold: u32,
    /// Minimum number of qualifying samples for a run to be emitted.
    pub duration_threshold: u32,
    pub gap_policy: GapPolicy,
}

impl Default for CongestionConfig {
    fn default() -> Self {
        Self {
            people_threshold: 10,
            duration_threshold: 10,
            gap_policy: GapPolicy::Tolerate,
        }
    }
}

impl CongestionConfig {
    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.duration_threshold == 0 {
            return Err(AnalyticsError::InvalidConfig(
                "duration_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

enum State {
    Outside,
    Inside {
        start: u32,
        /// Last qualifying second of the run
        last: u32,
        length: u32,
        max_people: u32,
    },
}

/// Run-length detector for one video.
pub struct CongestionDetector {
    video: VideoId,
    config: CongestionConfig,
    state: State,
    last_second: Option<u32>,
    windows: Vec<CongestionWindow>,
}

impl CongestionDetector {
    pub fn new(video: VideoId, config: CongestionConfig) -> Self {
        Self {
            video,
            config,
            state: State::Outside,
            last_second: None,
            windows: Vec::new(),
        }
    }

    /// Feed the next observed second. Seconds must be strictly increasing.
    pub fn ingest(&mut self, second: u32, people_count: u32) -> AnalyticsResult<()> {
        if let Some(previous) = self.last_second {
            if second <= previous {
                return Err(AnalyticsError::input_format(
                    &self.video,
                    format!(
                        "person counts out of order: second {} after {}",
                        second, previous
                    ),
                ));
            }
            if self.config.gap_policy == GapPolicy::BreakOnMissingSecond && second > previous + 1 {
                self.close_run();
            }
        }
        self.last_second = Some(second);

        if people_count < self.config.people_threshold {
            self.close_run();
            return Ok(());
        }

        match &mut self.state {
            State::Outside => {
                self.state = State::Inside {
                    start: second,
                    last: second,
                    length: 1,
                    max_people: people_count,
                };
            }
            State::Inside {
                last,
                length,
                max_people,
                ..
            } => {
                *last = second;
                *length += 1;
                *max_people = (*max_people).max(people_count);
            }
        }
        Ok(())
    }

    /// Close any open run and return the windows, sorted by start second.
    pub fn finalize(mut self) -> Vec<CongestionWindow> {
        self.close_run();
        self.windows
    }

    fn close_run(&mut self) {
        if let State::Inside {
            start,
            last,
            length,
            max_people,
        } = std::mem::replace(&mut self.state, State::Outside)
        {
            if length >= self.config.duration_threshold {
                self.windows.push(CongestionWindow {
                    video: self.video.clone(),
                    start_second: start,
                    end_second: last,
                    duration_seconds: length,
                    max_people,
                });
            }
        }
    }
}

/// Detect congestion windows in the person counts of one video.
pub fn detect_congestion(
    video: &VideoId,
    samples: &[PersonCountSample],
    config: &CongestionConfig,
) -> AnalyticsResult<Vec<CongestionWindow>> {
    config.validate()?;

    let mut detector = CongestionDetector::new(video.clone(), *config);
    for sample in samples {
        if &sample.video != video {
            return Err(AnalyticsError::input_format(
                video,
                format!("person count of video {} in input", sample.video),
            ));
        }
        detector.ingest(sample.second, sample.people_count)?;
    }
    Ok(detector.finalize())
}
