//! Utilization score and per-video insight summary.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use parkwatch_models::{
    round_to, ActivityDistributionSummary, ActivityLabel, CongestionWindow, CrowdStatistics,
    VideoId,
};

/// Weight of the activity component in the utilization score.
const ACTIVITY_WEIGHT: f64 = 0.6;
/// Weight of the crowd component in the utilization score.
const CROWD_WEIGHT: f64 = 0.4;

/// Coarse utilization band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UtilizationLevel {
    /// score > 0.7
    High,
    /// 0.4 < score <= 0.7
    Moderate,
    Low,
}

impl UtilizationLevel {
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            Self::High
        } else if score > 0.4 {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

/// Utilization of the observed area, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UtilizationScore {
    /// Activity mix weighted sitting=1, walking=2, high=3, scaled to `[0, 1]`
    pub activity_score: f64,
    /// Average crowd relative to the peak crowd
    pub crowd_score: f64,
    /// `0.6 * activity + 0.4 * crowd`, 2 dp
    pub score: f64,
    pub level: UtilizationLevel,
}

impl UtilizationScore {
    /// Missing summaries contribute a zero component.
    pub fn compute(
        distribution: Option<&ActivityDistributionSummary>,
        crowd: Option<&CrowdStatistics>,
    ) -> Self {
        let activity_score = distribution
            .map(|d| {
                ((d.sitting_percent + 2.0 * d.walking_percent + 3.0 * d.high_activity_percent)
                    / 100.0)
                    / 3.0
            })
            .unwrap_or(0.0);

        let crowd_score = match crowd {
            Some(c) if c.max_people > 0 => c.avg_people / f64::from(c.max_people),
            _ => 0.0,
        };

        let score = round_to(
            ACTIVITY_WEIGHT * activity_score + CROWD_WEIGHT * crowd_score,
            2,
        );

        Self {
            activity_score,
            crowd_score,
            score,
            level: UtilizationLevel::from_score(score),
        }
    }
}

/// Everything known about one analyzed video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoSummary {
    pub video: VideoId,
    pub crowd: Option<CrowdStatistics>,
    pub activity: Option<ActivityDistributionSummary>,
    pub congestion_windows: Vec<CongestionWindow>,
    pub utilization: UtilizationScore,
    pub insights: Vec<String>,
}

impl VideoSummary {
    pub fn build(
        video: VideoId,
        crowd: Option<CrowdStatistics>,
        activity: Option<ActivityDistributionSummary>,
        congestion_windows: Vec<CongestionWindow>,
    ) -> Self {
        let utilization = UtilizationScore::compute(activity.as_ref(), crowd.as_ref());
        let insights = insights(&utilization, activity.as_ref(), &congestion_windows);
        Self {
            video,
            crowd,
            activity,
            congestion_windows,
            utilization,
            insights,
        }
    }
}

fn insights(
    utilization: &UtilizationScore,
    activity: Option<&ActivityDistributionSummary>,
    windows: &[CongestionWindow],
) -> Vec<String> {
    let mut out = Vec::new();

    out.push(
        match utilization.level {
            UtilizationLevel::High => "Area is highly utilized with strong engagement levels.",
            UtilizationLevel::Moderate => "Area shows moderate utilization with balanced activity.",
            UtilizationLevel::Low => "Area appears underutilized during the recorded period.",
        }
        .to_string(),
    );

    if windows.is_empty() {
        out.push("No sustained congestion observed.".to_string());
    } else {
        let longest = windows
            .iter()
            .map(|w| w.duration_seconds)
            .max()
            .unwrap_or(0);
        out.push(format!(
            "{} congestion window(s) detected, longest lasting {} seconds.",
            windows.len(),
            longest
        ));
    }

    if let Some(activity) = activity {
        out.push(
            match activity.dominant_activity {
                ActivityLabel::Sitting => {
                    "Area is primarily used for passive activities (resting, socializing)."
                }
                ActivityLabel::Walking => "Area is primarily used for movement-based activities.",
                ActivityLabel::HighActivity => "Area shows high physical engagement.",
            }
            .to_string(),
        );
    }

    out
}
