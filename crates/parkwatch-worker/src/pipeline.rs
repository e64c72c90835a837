//! Orchestrator: sequences the per-video stage chain over the table store.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, Instrument};

use parkwatch_analytics::{
    activity_distribution, aggregate_motion, crowd_statistics, detect_congestion, merge_all,
    merge_partition, VideoSummary,
};
use parkwatch_ml::{ActivityClassifier, ActivityModel, BaselineClassifier, TrainedModel};
use parkwatch_models::{
    ActivityDistributionSummary, ActivityPrediction, CongestionWindow, CrowdStatistics,
    FeatureRow, LabeledTrainingRow, MotionSecondAggregate, ProcessOutcome, RebuildOutcome,
    TrainOutcome, VideoId,
};
use parkwatch_storage::{CsvSampleSource, SampleSource, StorageError, TableStore};

use crate::config::{ClassifierMode, PipelineConfig};
use crate::error::{ErrorKind, Stage, StageContext, WorkerError, WorkerResult};
use crate::logging::VideoLogger;
use crate::metrics;

/// Entry point for hosting applications.
///
/// Cheap to clone; clones share the table store and its write locks.
#[derive(Clone)]
pub struct Orchestrator {
    pub(crate) config: Arc<PipelineConfig>,
    pub(crate) store: TableStore,
    source: Arc<dyn SampleSource>,
}

impl Orchestrator {
    /// Orchestrator reading raw inputs from the CSV files under `data_dir`.
    pub fn new(config: PipelineConfig) -> WorkerResult<Self> {
        let source = Arc::new(CsvSampleSource::new(config.layout()));
        Self::with_source(config, source)
    }

    pub fn with_source(
        config: PipelineConfig,
        source: Arc<dyn SampleSource>,
    ) -> WorkerResult<Self> {
        config.validate()?;
        let store = TableStore::new(config.layout());
        Ok(Self {
            config: Arc::new(config),
            store,
            source,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }

    /// Run the full stage chain for one video and upsert its partitions.
    ///
    /// Every derived table is computed before the first write, so a failing
    /// stage leaves all partitions of the video at their last-good state.
    pub async fn process_new_video(&self, video: &VideoId) -> WorkerResult<ProcessOutcome> {
        let logger = VideoLogger::new(video, "process_new_video");
        let span = logger.create_span();

        let result = self.run_video(video, &logger).instrument(span).await;
        metrics::record_video_processed(result.is_ok());
        if let Err(e) = &result {
            logger.log_error(&e.to_string());
        }
        result
    }

    async fn run_video(
        &self,
        video: &VideoId,
        logger: &VideoLogger,
    ) -> WorkerResult<ProcessOutcome> {
        logger.log_start("loading raw inputs");

        let started = Instant::now();
        let (samples, people) = tokio::try_join!(
            self.source.motion_samples(video),
            self.source.person_counts(video),
        )
        .stage(video, Stage::LoadInputs)?;
        metrics::record_stage_duration(Stage::LoadInputs, started.elapsed());
        logger.log_stage(
            Stage::LoadInputs,
            &format!("{} motion samples, {} person counts", samples.len(), people.len()),
        );

        let motion = timed(video, Stage::MotionAggregation, || {
            aggregate_motion(video, &samples)
        })?;
        let features = timed(video, Stage::FeatureMerge, || {
            merge_partition(video, &motion, &people)
        })?;
        logger.log_stage(Stage::FeatureMerge, &format!("{} feature rows", features.len()));

        let started = Instant::now();
        let classifier = self
            .resolve_classifier(logger)
            .await
            .stage(video, Stage::Prediction)?;
        let predictions = classifier.predict_rows(&features);
        metrics::record_stage_duration(Stage::Prediction, started.elapsed());
        logger.log_stage(
            Stage::Prediction,
            &format!("{} rows labeled by {}", predictions.len(), classifier.name()),
        );

        let (distribution, crowd) = timed(video, Stage::Summaries, || {
            Ok::<_, WorkerError>((
                activity_distribution(video, &predictions),
                crowd_statistics(video, &people),
            ))
        })?;
        let windows = timed(video, Stage::CongestionDetection, || {
            detect_congestion(video, &people, &self.config.congestion)
        })?;

        let outcome = ProcessOutcome {
            video: video.clone(),
            rows_affected: features.len(),
            windows_found: windows.len(),
            prediction_summary: distribution.clone(),
        };

        let started = Instant::now();
        self.persist_video(video, motion, features, predictions, distribution, crowd, windows)
            .await
            .stage(video, Stage::Persist)?;
        metrics::record_stage_duration(Stage::Persist, started.elapsed());

        logger.log_completion(&format!(
            "{} feature rows, {} congestion windows",
            outcome.rows_affected, outcome.windows_found
        ));
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist_video(
        &self,
        video: &VideoId,
        motion: Vec<MotionSecondAggregate>,
        features: Vec<FeatureRow>,
        predictions: Vec<ActivityPrediction>,
        distribution: Option<ActivityDistributionSummary>,
        crowd: Option<CrowdStatistics>,
        windows: Vec<CongestionWindow>,
    ) -> WorkerResult<()> {
        self.store.replace_partition(video, motion).await?;
        self.store.replace_partition(video, features).await?;
        self.store.replace_partition(video, predictions).await?;
        self.store
            .replace_partition(video, distribution.into_iter().collect::<Vec<_>>())
            .await?;
        self.store
            .replace_partition(video, crowd.into_iter().collect::<Vec<_>>())
            .await?;
        self.store.replace_partition(video, windows).await?;
        Ok(())
    }

    async fn resolve_classifier(
        &self,
        logger: &VideoLogger,
    ) -> WorkerResult<Box<dyn ActivityClassifier>> {
        let baseline = || -> Box<dyn ActivityClassifier> {
            Box::new(BaselineClassifier::new(self.config.baseline))
        };

        match self.config.classifier {
            ClassifierMode::Baseline => Ok(baseline()),
            ClassifierMode::Model => {
                let model: Box<dyn ActivityClassifier> = Box::new(self.load_model().await?);
                Ok(model)
            }
            ClassifierMode::ModelOrBaseline => match self.load_model().await {
                Ok(model) => {
                    let model: Box<dyn ActivityClassifier> = Box::new(model);
                    Ok(model)
                }
                Err(e) if e.kind() == ErrorKind::MissingResource => {
                    logger.log_warning(&format!("{}; labeling with the baseline", e));
                    Ok(baseline())
                }
                Err(e) => Err(e),
            },
        }
    }

    /// Load and check the persisted model.
    pub async fn load_model(&self) -> WorkerResult<ActivityModel> {
        let model: ActivityModel = self.store.load_model().await?;
        model.validate()?;
        Ok(model)
    }

    /// Train from the labeled corpus alone and persist the artifacts.
    pub async fn train_model(&self) -> WorkerResult<TrainOutcome> {
        let trained = self.train_and_persist().await?;
        Ok(TrainOutcome {
            labeled_rows: trained.labeled_rows,
            report: trained.report,
            feature_importance: trained.feature_importance,
        })
    }

    /// Fit on the current corpus, then save model, ranking and report.
    pub(crate) async fn train_and_persist(&self) -> WorkerResult<TrainedModel> {
        let corpus: Vec<LabeledTrainingRow> = self.store.read_all().await?;
        let config = self.config.training.clone();

        let started = Instant::now();
        let trained =
            tokio::task::spawn_blocking(move || parkwatch_ml::train_model(&corpus, &config))
                .await
                .map_err(|e| WorkerError::task_failed(e.to_string()))??;
        metrics::record_training_duration(started.elapsed());

        self.store.save_model(&trained.model).await?;
        self.store
            .write_feature_importance(&trained.feature_importance)
            .await?;
        self.store.write_training_report(&trained.report).await?;

        info!(
            labeled_rows = trained.labeled_rows,
            accuracy = trained.report.accuracy,
            "Model artifacts updated"
        );
        Ok(trained)
    }

    /// Recompute the motion aggregates and feature rows of every video from
    /// the raw inputs, replacing both tables.
    pub async fn rebuild_feature_store(&self) -> WorkerResult<RebuildOutcome> {
        let motion_videos = self.source.videos_with_motion().await?;
        let people_videos = self.source.videos_with_person_counts().await?;

        let mut motion = Vec::new();
        for video in &motion_videos {
            let samples = self
                .source
                .motion_samples(video)
                .await
                .stage(video, Stage::LoadInputs)?;
            motion.extend(timed(video, Stage::MotionAggregation, || {
                aggregate_motion(video, &samples)
            })?);
        }

        let mut people = Vec::new();
        for video in &people_videos {
            people.extend(
                self.source
                    .person_counts(video)
                    .await
                    .stage(video, Stage::LoadInputs)?,
            );
        }

        let features = merge_all(&motion, &people)?;

        let videos: BTreeSet<&VideoId> = motion_videos.iter().chain(&people_videos).collect();
        let outcome = RebuildOutcome {
            videos: videos.len(),
            motion_rows: motion.len(),
            feature_rows: features.len(),
        };

        self.store.rewrite_all(motion).await?;
        self.store.rewrite_all(features).await?;

        info!(
            videos = outcome.videos,
            motion_rows = outcome.motion_rows,
            feature_rows = outcome.feature_rows,
            "Feature store rebuilt"
        );
        Ok(outcome)
    }

    /// Summaries of one processed video.
    pub async fn video_summary(&self, video: &VideoId) -> WorkerResult<VideoSummary> {
        let (crowd, activity, windows) = tokio::try_join!(
            self.store.read_partition::<CrowdStatistics>(video),
            self.store.read_partition::<ActivityDistributionSummary>(video),
            self.store.read_partition::<CongestionWindow>(video),
        )?;

        if crowd.is_empty() && activity.is_empty() && windows.is_empty() {
            let what = format!("analysis results for video {}", video);
            return Err(StorageError::not_found(what).into());
        }

        Ok(VideoSummary::build(
            video.clone(),
            crowd.into_iter().next(),
            activity.into_iter().next(),
            windows,
        ))
    }

    /// Videos with rows in the feature store.
    pub async fn list_videos(&self) -> WorkerResult<Vec<VideoId>> {
        Ok(self.store.list_videos::<FeatureRow>().await?)
    }
}

/// Run a synchronous stage, recording its duration and tagging failures.
fn timed<T, E>(video: &VideoId, stage: Stage, f: impl FnOnce() -> Result<T, E>) -> WorkerResult<T>
where
    E: Into<WorkerError>,
{
    let started = Instant::now();
    let result = f().stage(video, stage);
    metrics::record_stage_duration(stage, started.elapsed());
    result
}
