//! Persisted random-forest activity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parkwatch_models::{
    round_to, ActivityLabel, FeatureImportance, FeatureVector, FEATURE_COUNT, FEATURE_NAMES,
};
use parkwatch_storage::VersionedArtifact;

use crate::classifier::ActivityClassifier;
use crate::error::{MlError, MlResult};
use crate::forest::RandomForest;

/// Artifact format version; bump when the serialized layout changes.
pub const MODEL_VERSION: u32 = 1;

/// Trained classifier over `[avg_motion_ratio, motion_std, people_count]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityModel {
    pub version: u32,
    /// Input order the forest was fitted on
    pub feature_names: Vec<String>,
    pub forest: RandomForest,
    pub labeled_rows: usize,
    pub trained_at: DateTime<Utc>,
}

impl ActivityModel {
    pub fn new(forest: RandomForest, labeled_rows: usize) -> Self {
        Self {
            version: MODEL_VERSION,
            feature_names: FEATURE_NAMES.iter().map(|f| f.to_string()).collect(),
            forest,
            labeled_rows,
            trained_at: Utc::now(),
        }
    }

    /// Reject artifacts fitted on a different feature order.
    pub fn validate(&self) -> MlResult<()> {
        if self.feature_names.iter().map(String::as_str).ne(FEATURE_NAMES) {
            return Err(MlError::IncompatibleModel(format!(
                "model expects features {:?}, pipeline provides {:?}",
                self.feature_names, FEATURE_NAMES
            )));
        }
        Ok(())
    }

    /// Class probabilities indexed like [`ActivityLabel::ALL`].
    pub fn predict_proba(&self, features: &FeatureVector) -> [f64; 3] {
        self.forest.predict_proba(features)
    }

    pub fn feature_importance(&self) -> Vec<FeatureImportance> {
        rank_features(self.forest.feature_importances())
    }
}

impl VersionedArtifact for ActivityModel {
    const CURRENT_VERSION: u32 = MODEL_VERSION;

    fn version(&self) -> u32 {
        self.version
    }
}

impl ActivityClassifier for ActivityModel {
    fn name(&self) -> &'static str {
        "random_forest"
    }

    fn predict(&self, features: &FeatureVector) -> ActivityLabel {
        ActivityLabel::from_index(self.forest.predict(features)).unwrap_or(ActivityLabel::Sitting)
    }
}

/// Rank features by importance, most important first.
///
/// Equal importances keep the fixed feature order.
pub fn rank_features(importances: [f64; FEATURE_COUNT]) -> Vec<FeatureImportance> {
    let mut order: Vec<usize> = (0..FEATURE_COUNT).collect();
    order.sort_by(|&a, &b| importances[b].total_cmp(&importances[a]));

    order
        .into_iter()
        .enumerate()
        .map(|(position, feature)| FeatureImportance {
            rank: position + 1,
            feature: FEATURE_NAMES[feature].to_string(),
            importance: round_to(importances[feature], 6),
        })
        .collect()
}
