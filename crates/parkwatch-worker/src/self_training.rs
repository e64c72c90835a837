//! Self-training: feed a video's predictions back into the labeled corpus
//! and retrain.

use std::collections::BTreeSet;

use tracing::Instrument;

use parkwatch_models::{
    ActivityPrediction, LabeledTrainingRow, PartialUpdateWarning, RetrainOutcome, TableRow, VideoId,
};

use crate::error::{Stage, StageContext, WorkerResult};
use crate::logging::VideoLogger;
use crate::metrics::{self, RetrainResult};
use crate::pipeline::Orchestrator;

impl Orchestrator {
    /// Append the video's predictions to the corpus as pseudo labels, then
    /// retrain.
    ///
    /// Corpus rows are never overwritten: a prediction whose key is already
    /// in the corpus is dropped. When nothing survives, retraining is
    /// skipped. A failed retraining leaves the appended rows committed and
    /// is reported in the outcome, not as an error.
    pub async fn retrain_from_feedback(&self, video: &VideoId) -> WorkerResult<RetrainOutcome> {
        let logger = VideoLogger::new(video, "retrain_from_feedback");
        let span = logger.create_span();

        let result = self.run_feedback(video, &logger).instrument(span).await;
        if let Err(e) = &result {
            logger.log_error(&e.to_string());
        }
        result
    }

    async fn run_feedback(
        &self,
        video: &VideoId,
        logger: &VideoLogger,
    ) -> WorkerResult<RetrainOutcome> {
        logger.log_start("collecting pseudo labels");

        let predictions: Vec<ActivityPrediction> = self
            .store
            .read_partition(video)
            .await
            .stage(video, Stage::CorpusUpdate)?;
        let rows_added = self
            .append_pseudo_labels(video, &predictions)
            .await
            .stage(video, Stage::CorpusUpdate)?;

        if rows_added == 0 {
            metrics::record_retrain(RetrainResult::Skipped);
            logger.log_completion("no new pseudo-labeled rows; retraining skipped");
            return Ok(RetrainOutcome::no_op(video.clone()));
        }

        metrics::record_pseudo_labels_added(rows_added);
        logger.log_stage(
            Stage::CorpusUpdate,
            &format!("{} pseudo-labeled rows appended", rows_added),
        );

        match self.train_and_persist().await {
            Ok(trained) => {
                metrics::record_retrain(RetrainResult::Trained);
                logger.log_completion(&format!(
                    "retrained on {} labeled rows, accuracy {:.3}",
                    trained.labeled_rows, trained.report.accuracy
                ));
                Ok(RetrainOutcome {
                    video: video.clone(),
                    rows_added,
                    trained: true,
                    report: Some(trained.report),
                    warning: None,
                    reason: None,
                })
            }
            Err(e) => {
                let warning = PartialUpdateWarning {
                    video: video.clone(),
                    rows_committed: rows_added,
                    cause_kind: e.kind().as_str().to_string(),
                    cause: e.to_string(),
                };
                metrics::record_retrain(RetrainResult::Failed);
                logger.log_warning(&warning.to_string());
                Ok(RetrainOutcome {
                    video: video.clone(),
                    rows_added,
                    trained: false,
                    report: None,
                    warning: Some(warning),
                    reason: Some(format!("Training failed: {}", e)),
                })
            }
        }
    }

    /// Append the predictions whose keys are not yet in the corpus.
    ///
    /// Returns the number of rows appended; the corpus file is left
    /// untouched when that number is 0.
    async fn append_pseudo_labels(
        &self,
        video: &VideoId,
        predictions: &[ActivityPrediction],
    ) -> WorkerResult<usize> {
        let candidates: Vec<LabeledTrainingRow> =
            predictions.iter().map(ActivityPrediction::to_pseudo_label).collect();
        if candidates.is_empty() {
            return Ok(0);
        }

        let current: Vec<LabeledTrainingRow> = self.store.read_partition(video).await?;
        if unseen(&current, &candidates).is_empty() {
            return Ok(0);
        }

        // Recomputed under the table lock; the corpus may have moved since
        let mut added = 0;
        self.store
            .modify_partition(video, |mut rows: Vec<LabeledTrainingRow>| {
                let fresh = unseen(&rows, &candidates);
                added = fresh.len();
                rows.extend(fresh);
                Ok(rows)
            })
            .await?;
        Ok(added)
    }
}

fn unseen(
    corpus: &[LabeledTrainingRow],
    candidates: &[LabeledTrainingRow],
) -> Vec<LabeledTrainingRow> {
    let known: BTreeSet<_> = corpus.iter().map(|row| row.key()).collect();
    candidates
        .iter()
        .filter(|row| !known.contains(&row.key()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkwatch_models::ActivityLabel;

    fn row(second: u32, label: ActivityLabel, pseudo: bool) -> LabeledTrainingRow {
        LabeledTrainingRow {
            video: VideoId::new("court").unwrap(),
            second,
            avg_motion_ratio: 0.001,
            motion_std: 0.0,
            people_count: 2,
            activity_label: Some(label),
            is_pseudo_label: pseudo,
        }
    }

    #[test]
    fn test_unseen_drops_existing_keys() {
        let corpus = vec![
            row(0, ActivityLabel::Sitting, false),
            row(2, ActivityLabel::Walking, true),
        ];
        let candidates = vec![
            row(0, ActivityLabel::HighActivity, true),
            row(1, ActivityLabel::Walking, true),
            row(2, ActivityLabel::Sitting, true),
        ];

        let fresh = unseen(&corpus, &candidates);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].second, 1);
    }

    #[test]
    fn test_unseen_with_empty_corpus() {
        let candidates = vec![row(5, ActivityLabel::Walking, true)];
        assert_eq!(unseen(&[], &candidates), candidates);
    }
}
