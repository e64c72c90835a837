//! Held-out evaluation: per-class metrics and confusion matrix.

use chrono::Utc;

use parkwatch_models::{ActivityLabel, ClassMetrics, ClassificationReport};

/// Split sizes and seed recorded alongside the metrics.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext {
    pub train_size: usize,
    pub test_size: usize,
    pub seed: u64,
}

/// Build the classification report for `classes` (in label order).
///
/// Precision, recall and F1 are 0 when their denominator is 0.
pub fn classification_report(
    classes: &[ActivityLabel],
    y_true: &[ActivityLabel],
    y_pred: &[ActivityLabel],
    context: ReportContext,
) -> ClassificationReport {
    let position = |label: ActivityLabel| classes.iter().position(|c| *c == label);

    let mut confusion = vec![vec![0usize; classes.len()]; classes.len()];
    let mut correct = 0usize;
    for (truth, predicted) in y_true.iter().zip(y_pred) {
        if truth == predicted {
            correct += 1;
        }
        if let (Some(t), Some(p)) = (position(*truth), position(*predicted)) {
            confusion[t][p] += 1;
        }
    }

    let metrics: Vec<ClassMetrics> = classes
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let tp = confusion[i][i];
            let support: usize = confusion[i].iter().sum();
            let predicted: usize = confusion.iter().map(|row| row[i]).sum();

            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            ClassMetrics {
                label: *label,
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    let total_support: usize = metrics.iter().map(|m| m.support).sum();
    let macro_f1 = if metrics.is_empty() {
        0.0
    } else {
        metrics.iter().map(|m| m.f1).sum::<f64>() / metrics.len() as f64
    };
    let weighted_f1 = if total_support == 0 {
        0.0
    } else {
        metrics
            .iter()
            .map(|m| m.f1 * m.support as f64)
            .sum::<f64>()
            / total_support as f64
    };

    ClassificationReport {
        classes: metrics,
        accuracy: ratio(correct, y_true.len()),
        macro_f1,
        weighted_f1,
        confusion_matrix: confusion,
        train_size: context.train_size,
        test_size: context.test_size,
        seed: context.seed,
        trained_at: Utc::now(),
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ActivityLabel::*;

    fn context() -> ReportContext {
        ReportContext {
            train_size: 10,
            test_size: 6,
            seed: 42,
        }
    }

    #[test]
    fn test_report_metrics() {
        let classes = [Sitting, Walking, HighActivity];
        let y_true = [Sitting, Sitting, Walking, Walking, HighActivity, HighActivity];
        let y_pred = [Sitting, Walking, Walking, Walking, HighActivity, Sitting];

        let report = classification_report(&classes, &y_true, &y_pred, context());

        assert_eq!(report.confusion_matrix, vec![vec![1, 1, 0], vec![0, 2, 0], vec![1, 0, 1]]);
        assert!((report.accuracy - 4.0 / 6.0).abs() < 1e-12);

        let sitting = report.class(Sitting).unwrap();
        assert_eq!(sitting.support, 2);
        assert_eq!(sitting.precision, 0.5);
        assert_eq!(sitting.recall, 0.5);

        let walking = report.class(Walking).unwrap();
        assert!((walking.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(walking.recall, 1.0);
        assert!((walking.f1 - 0.8).abs() < 1e-12);

        let high = report.class(HighActivity).unwrap();
        assert_eq!(high.precision, 1.0);
        assert_eq!(high.recall, 0.5);
    }

    #[test]
    fn test_absent_predictions_give_zero_precision() {
        let classes = [Sitting, Walking];
        let report = classification_report(
            &classes,
            &[Sitting, Walking],
            &[Sitting, Sitting],
            context(),
        );
        let walking = report.class(Walking).unwrap();
        assert_eq!(walking.precision, 0.0);
        assert_eq!(walking.f1, 0.0);
        assert_eq!(report.confusion_matrix.len(), 2);
        assert_eq!(report.seed, 42);
    }
}
