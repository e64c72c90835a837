//! Rule-based classifier on `avg_motion_ratio`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use parkwatch_models::{ActivityLabel, FeatureVector};

use crate::classifier::ActivityClassifier;
use crate::error::{MlError, MlResult};

/// Ordered motion thresholds `low < high`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BaselineThresholds {
    /// Below this ratio a window is `sitting`.
    pub low: f64,
    /// Below this ratio (and at or above `low`) a window is `walking`.
    pub high: f64,
}

impl Default for BaselineThresholds {
    fn default() -> Self {
        Self {
            low: 0.0015,
            high: 0.006,
        }
    }
}

impl BaselineThresholds {
    pub fn new(low: f64, high: f64) -> MlResult<Self> {
        let thresholds = Self { low, high };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> MlResult<()> {
        if !self.low.is_finite() || !self.high.is_finite() || self.low >= self.high {
            return Err(MlError::invalid_config(format!(
                "baseline thresholds must satisfy low < high, got low={} high={}",
                self.low, self.high
            )));
        }
        Ok(())
    }

    pub fn classify(&self, avg_motion_ratio: f64) -> ActivityLabel {
        if avg_motion_ratio < self.low {
            ActivityLabel::Sitting
        } else if avg_motion_ratio < self.high {
            ActivityLabel::Walking
        } else {
            ActivityLabel::HighActivity
        }
    }
}

/// Stateless baseline; needs no training.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineClassifier {
    thresholds: BaselineThresholds,
}

impl BaselineClassifier {
    pub fn new(thresholds: BaselineThresholds) -> Self {
        Self { thresholds }
    }
}

impl ActivityClassifier for BaselineClassifier {
    fn name(&self) -> &'static str {
        "baseline"
    }

    fn predict(&self, features: &FeatureVector) -> ActivityLabel {
        self.thresholds.classify(features.avg_motion_ratio())
    }
}
