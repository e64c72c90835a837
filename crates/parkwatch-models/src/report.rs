//! Training evaluation artifacts.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::activity::ActivityLabel;

/// Precision/recall/F1 of one class on the held-out split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClassMetrics {
    pub label: ActivityLabel,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of held-out rows whose true label is `label`
    pub support: usize,
}

/// Held-out classification report produced by a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClassificationReport {
    /// One entry per label present in the corpus, in label order
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_f1: f64,
    pub weighted_f1: f64,
    /// `confusion_matrix[true][predicted]`, indexed like `classes`
    pub confusion_matrix: Vec<Vec<usize>>,
    pub train_size: usize,
    pub test_size: usize,
    pub seed: u64,
    pub trained_at: DateTime<Utc>,
}

impl ClassificationReport {
    pub fn class(&self, label: ActivityLabel) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.label == label)
    }
}

/// Importance of one model input feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeatureImportance {
    /// 1-based rank, most important first
    pub rank: usize,
    pub feature: String,
    pub importance: f64,
}
