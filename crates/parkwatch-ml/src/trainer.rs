//! Training entrypoint: split, fit, evaluate, rank features.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use parkwatch_models::{
    ActivityLabel, ClassificationReport, FeatureImportance, FeatureVector, LabeledTrainingRow,
};

use crate::classifier::ActivityClassifier;
use crate::error::{MlError, MlResult};
use crate::forest::{ForestParams, RandomForest};
use crate::metrics::{classification_report, ReportContext};
use crate::model::ActivityModel;
use crate::split::stratified_split;

/// Training hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrainingConfig {
    /// Share of labeled rows held out for evaluation
    pub test_fraction: f64,
    /// Seed of the split and of every tree
    pub seed: u64,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Classes with fewer labeled rows make training degenerate
    pub min_samples_per_class: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            n_estimators: 150,
            max_depth: None,
            min_samples_split: 2,
            min_samples_per_class: 2,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> MlResult<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(MlError::invalid_config(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.n_estimators == 0 {
            return Err(MlError::invalid_config("n_estimators must be at least 1"));
        }
        if self.min_samples_split < 2 {
            return Err(MlError::invalid_config("min_samples_split must be at least 2"));
        }
        if self.min_samples_per_class < 2 {
            return Err(MlError::invalid_config(
                "min_samples_per_class must be at least 2",
            ));
        }
        if self.max_depth == Some(0) {
            return Err(MlError::invalid_config("max_depth must be at least 1"));
        }
        Ok(())
    }
}

/// Output of one training run.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub model: ActivityModel,
    pub report: ClassificationReport,
    pub feature_importance: Vec<FeatureImportance>,
    /// Labeled corpus rows the split was drawn from
    pub labeled_rows: usize,
}

/// Train a forest on the labeled rows of the corpus.
///
/// Unlabeled rows are skipped. The model is fitted on the training half
/// only; the held-out half produces the report.
pub fn train_model(
    corpus: &[LabeledTrainingRow],
    config: &TrainingConfig,
) -> MlResult<TrainedModel> {
    config.validate()?;

    let (features, labels): (Vec<FeatureVector>, Vec<ActivityLabel>) = corpus
        .iter()
        .filter_map(|row| row.activity_label.map(|label| (row.features(), label)))
        .unzip();

    if labels.is_empty() {
        return Err(MlError::degenerate("training corpus has no labeled rows"));
    }

    let split = stratified_split(
        &labels,
        config.test_fraction,
        config.seed,
        config.min_samples_per_class,
    )?;

    let train_x: Vec<FeatureVector> = split.train.iter().map(|&i| features[i]).collect();
    let train_y: Vec<usize> = split.train.iter().map(|&i| labels[i].index()).collect();

    let forest = RandomForest::fit(
        &train_x,
        &train_y,
        &ForestParams {
            n_estimators: config.n_estimators,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            seed: config.seed,
        },
    );
    let model = ActivityModel::new(forest, labels.len());

    let y_true: Vec<ActivityLabel> = split.test.iter().map(|&i| labels[i]).collect();
    let y_pred: Vec<ActivityLabel> = split
        .test
        .iter()
        .map(|&i| model.predict(&features[i]))
        .collect();

    let present: Vec<ActivityLabel> = ActivityLabel::ALL
        .into_iter()
        .filter(|label| labels.contains(label))
        .collect();

    let report = classification_report(
        &present,
        &y_true,
        &y_pred,
        ReportContext {
            train_size: split.train.len(),
            test_size: split.test.len(),
            seed: config.seed,
        },
    );
    let feature_importance = model.feature_importance();

    info!(
        labeled_rows = labels.len(),
        train_size = report.train_size,
        test_size = report.test_size,
        accuracy = report.accuracy,
        macro_f1 = report.macro_f1,
        "Trained activity model"
    );

    Ok(TrainedModel {
        model,
        report,
        feature_importance,
        labeled_rows: labels.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkwatch_models::VideoId;

    fn row(second: u32, ratio: f64, label: Option<ActivityLabel>) -> LabeledTrainingRow {
        LabeledTrainingRow {
            video: VideoId::new("train").unwrap(),
            second,
            avg_motion_ratio: ratio,
            motion_std: ratio / 4.0,
            people_count: 3,
            activity_label: label,
            is_pseudo_label: false,
        }
    }

    fn corpus() -> Vec<LabeledTrainingRow> {
        let mut rows = Vec::new();
        let mut second = 0;
        for i in 0..20 {
            let jitter = i as f64 * 0.00001;
            for (ratio, label) in [
                (0.0005, ActivityLabel::Sitting),
                (0.003, ActivityLabel::Walking),
                (0.02, ActivityLabel::HighActivity),
            ] {
                rows.push(row(second, ratio + jitter, Some(label)));
                second += 1;
            }
        }
        rows
    }

    fn config() -> TrainingConfig {
        TrainingConfig {
            n_estimators: 20,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_train_reports_on_held_out_rows() {
        let trained = train_model(&corpus(), &config()).unwrap();

        assert_eq!(trained.labeled_rows, 60);
        assert_eq!(trained.report.test_size, 12);
        assert_eq!(trained.report.train_size, 48);
        assert_eq!(trained.report.classes.len(), 3);
        assert_eq!(trained.report.accuracy, 1.0);
        assert_eq!(trained.feature_importance.len(), 3);
        assert!(trained.model.validate().is_ok());
    }

    #[test]
    fn test_unlabeled_rows_are_ignored() {
        let mut rows = corpus();
        rows.push(row(1000, 0.5, None));
        let trained = train_model(&rows, &config()).unwrap();
        assert_eq!(trained.labeled_rows, 60);
    }

    #[test]
    fn test_training_is_reproducible() {
        let a = train_model(&corpus(), &config()).unwrap();
        let b = train_model(&corpus(), &config()).unwrap();
        assert_eq!(a.model.forest, b.model.forest);
        assert_eq!(a.report.confusion_matrix, b.report.confusion_matrix);
    }

    #[test]
    fn test_rare_class_is_degenerate() {
        let mut rows: Vec<_> = corpus()
            .into_iter()
            .filter(|r| r.activity_label != Some(ActivityLabel::HighActivity))
            .collect();
        rows.push(row(5000, 0.02, Some(ActivityLabel::HighActivity)));

        let err = train_model(&rows, &config()).unwrap_err();
        assert!(err.is_degenerate());
    }

    #[test]
    fn test_empty_corpus_is_degenerate() {
        let err = train_model(&[], &config()).unwrap_err();
        assert!(err.is_degenerate());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = TrainingConfig {
            n_estimators: 0,
            ..TrainingConfig::default()
        };
        assert!(matches!(train_model(&corpus(), &bad), Err(MlError::InvalidConfig(_))));
    }
}
