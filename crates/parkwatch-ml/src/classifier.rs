//! Classifier seam shared by the baseline and the trained model.

use parkwatch_models::{ActivityLabel, ActivityPrediction, FeatureRow, FeatureVector};

/// Labels one-second feature vectors.
pub trait ActivityClassifier: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn predict(&self, features: &FeatureVector) -> ActivityLabel;

    /// Label every row, keeping row order.
    fn predict_rows(&self, rows: &[FeatureRow]) -> Vec<ActivityPrediction> {
        rows.iter()
            .map(|row| ActivityPrediction::from_row(row, self.predict(&row.features())))
            .collect()
    }
}
