use std::path::PathBuf;

use tempfile::TempDir;

use parkwatch_analytics::CongestionConfig;
use parkwatch_ml::TrainingConfig;
use parkwatch_models::{
    ActivityLabel, ActivityPrediction, CongestionWindow, FeatureRow, LabeledTrainingRow, TableRow,
    VideoId,
};
use parkwatch_storage::DataLayout;
use parkwatch_worker::{ClassifierMode, ErrorKind, Orchestrator, PipelineConfig, Stage};

const SITTING: f64 = 0.0005;
const WALKING: f64 = 0.003;
const HIGH: f64 = 0.02;

fn video(id: &str) -> VideoId {
    VideoId::new(id).unwrap()
}

fn config(dir: &TempDir, classifier: ClassifierMode) -> PipelineConfig {
    PipelineConfig {
        data_dir: dir.path().to_path_buf(),
        classifier,
        training: TrainingConfig {
            n_estimators: 10,
            ..TrainingConfig::default()
        },
        ..PipelineConfig::default()
    }
}

fn orchestrator(dir: &TempDir, classifier: ClassifierMode) -> Orchestrator {
    Orchestrator::new(config(dir, classifier)).unwrap()
}

/// Two frames per second, both with the ratio of that second.
async fn write_motion(dir: &TempDir, id: &str, ratios: &[f64]) {
    let path = DataLayout::new(dir.path()).motion_raw_path(&video(id));
    let mut csv = String::from("frame,second,motion_pixels,motion_ratio\n");
    for (second, ratio) in ratios.iter().enumerate() {
        for half in 0..2 {
            let frame = second * 2 + half;
            let pixels = (ratio * 100_000.0) as u64;
            csv.push_str(&format!("{},{},{},{}\n", frame, frame as f64 / 2.0, pixels, ratio));
        }
    }
    write_file(path, csv).await;
}

async fn write_people(dir: &TempDir, id: &str, counts: &[(u32, u32)]) {
    let path = DataLayout::new(dir.path()).people_path(&video(id));
    let mut csv = String::from("video,second,people_count\n");
    for (second, count) in counts {
        csv.push_str(&format!("{},{},{}\n", id, second, count));
    }
    write_file(path, csv).await;
}

async fn write_file(path: PathBuf, contents: String) {
    tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
    tokio::fs::write(path, contents).await.unwrap();
}

/// Twelve seconds: crowded for 0..=10, quiet at 11.
async fn write_crowded_video(dir: &TempDir, id: &str, ratios: &[f64]) {
    write_motion(dir, id, ratios).await;
    let counts: Vec<(u32, u32)> = (0..12).map(|s| (s, if s <= 10 { 12 } else { 2 })).collect();
    write_people(dir, id, &counts).await;
}

fn mixed_ratios(seconds: usize) -> Vec<f64> {
    (0..seconds).map(|s| [SITTING, WALKING, HIGH][s % 3]).collect()
}

fn table_paths(dir: &TempDir) -> Vec<PathBuf> {
    let layout = DataLayout::new(dir.path());
    [
        "motion_aggregated",
        "master_dataset",
        "activity_ml_predictions",
        "activity_distribution",
        "crowd_statistics",
        "congestion_windows",
    ]
    .iter()
    .map(|table| layout.table_path(table))
    .collect()
}

async fn snapshot(dir: &TempDir) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    for path in table_paths(dir) {
        out.push(tokio::fs::read(path).await.unwrap_or_default());
    }
    out
}

/// Lines of every table that belong to `id`.
async fn partition_lines(dir: &TempDir, id: &str) -> Vec<String> {
    let prefix = format!("{},", id);
    let mut lines = Vec::new();
    for path in table_paths(dir) {
        let text = tokio::fs::read_to_string(path).await.unwrap_or_default();
        lines.extend(text.lines().filter(|l| l.starts_with(&prefix)).map(String::from));
    }
    lines
}

fn ground_truth(id: &str, per_class: u32) -> Vec<LabeledTrainingRow> {
    let mut rows = Vec::new();
    let mut second = 0;
    for i in 0..per_class {
        let jitter = i as f64 * 0.00001;
        for (ratio, label) in [
            (SITTING, ActivityLabel::Sitting),
            (WALKING, ActivityLabel::Walking),
            (HIGH, ActivityLabel::HighActivity),
        ] {
            rows.push(LabeledTrainingRow {
                video: video(id),
                second,
                avg_motion_ratio: ratio + jitter,
                motion_std: 0.0,
                people_count: 3,
                activity_label: Some(label),
                is_pseudo_label: false,
            });
            second += 1;
        }
    }
    rows
}

#[tokio::test]
async fn test_process_new_video_writes_every_table() {
    let dir = TempDir::new().unwrap();
    write_crowded_video(&dir, "north_gate", &[SITTING; 12]).await;

    let orchestrator = orchestrator(&dir, ClassifierMode::Baseline);
    let outcome = orchestrator.process_new_video(&video("north_gate")).await.unwrap();

    assert_eq!(outcome.rows_affected, 12);
    assert_eq!(outcome.windows_found, 1);
    let summary = outcome.prediction_summary.unwrap();
    assert_eq!(summary.sitting_percent, 100.0);
    assert_eq!(summary.dominant_activity, ActivityLabel::Sitting);

    let windows: Vec<CongestionWindow> = orchestrator.store().read_all().await.unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!((windows[0].start_second, windows[0].end_second), (0, 10));
    assert_eq!(windows[0].duration_seconds, 11);
    assert_eq!(windows[0].max_people, 12);

    let features: Vec<FeatureRow> = orchestrator.store().read_all().await.unwrap();
    assert_eq!(features.len(), 12);
    assert_eq!(features[11].people_count, 2);
}

#[tokio::test]
async fn test_reprocessing_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    write_crowded_video(&dir, "plaza", &mixed_ratios(12)).await;
    let orchestrator = orchestrator(&dir, ClassifierMode::Baseline);

    orchestrator.process_new_video(&video("plaza")).await.unwrap();
    let first = snapshot(&dir).await;
    orchestrator.process_new_video(&video("plaza")).await.unwrap();
    let second = snapshot(&dir).await;

    assert!(first.iter().all(|table| !table.is_empty()));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_upsert_leaves_other_videos_untouched() {
    let dir = TempDir::new().unwrap();
    write_crowded_video(&dir, "video_a", &mixed_ratios(12)).await;
    write_crowded_video(&dir, "video_b", &[HIGH; 12]).await;
    let orchestrator = orchestrator(&dir, ClassifierMode::Baseline);

    orchestrator.process_new_video(&video("video_a")).await.unwrap();
    let before = partition_lines(&dir, "video_a").await;

    orchestrator.process_new_video(&video("video_b")).await.unwrap();
    write_motion(&dir, "video_b", &[SITTING; 5]).await;
    orchestrator.process_new_video(&video("video_b")).await.unwrap();

    assert!(!before.is_empty());
    assert_eq!(partition_lines(&dir, "video_a").await, before);
    assert!(!partition_lines(&dir, "video_b").await.is_empty());
}

#[tokio::test]
async fn test_failed_stage_keeps_last_good_partitions() {
    let dir = TempDir::new().unwrap();
    write_crowded_video(&dir, "plaza", &mixed_ratios(12)).await;
    let orchestrator = orchestrator(&dir, ClassifierMode::Baseline);
    orchestrator.process_new_video(&video("plaza")).await.unwrap();
    let before = snapshot(&dir).await;

    let path = DataLayout::new(dir.path()).motion_raw_path(&video("plaza"));
    write_file(path, "frame,second,motion_pixels,motion_ratio\n0,0,10,lots\n".to_string()).await;

    let err = orchestrator.process_new_video(&video("plaza")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InputFormat);
    assert_eq!(err.stage(), Some(Stage::LoadInputs));
    assert!(!err.is_retryable());
    assert_eq!(snapshot(&dir).await, before);
}

#[tokio::test]
async fn test_missing_raw_input_is_missing_resource() {
    let dir = TempDir::new().unwrap();
    write_motion(&dir, "plaza", &[SITTING; 3]).await;

    let err = orchestrator(&dir, ClassifierMode::Baseline)
        .process_new_video(&video("plaza"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingResource);
}

#[tokio::test]
async fn test_missing_model_fails_before_any_write() {
    let dir = TempDir::new().unwrap();
    write_crowded_video(&dir, "plaza", &mixed_ratios(12)).await;

    let err = orchestrator(&dir, ClassifierMode::Model)
        .process_new_video(&video("plaza"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingResource);
    assert_eq!(err.stage(), Some(Stage::Prediction));
    assert!(snapshot(&dir).await.iter().all(|table| table.is_empty()));
}

#[tokio::test]
async fn test_model_or_baseline_falls_back_without_model() {
    let dir = TempDir::new().unwrap();
    write_crowded_video(&dir, "plaza", &[WALKING; 12]).await;

    let outcome = orchestrator(&dir, ClassifierMode::ModelOrBaseline)
        .process_new_video(&video("plaza"))
        .await
        .unwrap();
    assert_eq!(
        outcome.prediction_summary.unwrap().dominant_activity,
        ActivityLabel::Walking
    );
}

#[tokio::test]
async fn test_gap_in_observed_seconds_does_not_break_run() {
    let dir = TempDir::new().unwrap();
    write_motion(&dir, "gap", &[SITTING; 11]).await;
    let counts: Vec<(u32, u32)> = (0..=10).filter(|&s| s != 4).map(|s| (s, 8)).collect();
    write_people(&dir, "gap", &counts).await;

    let mut config = config(&dir, ClassifierMode::Baseline);
    config.congestion = CongestionConfig {
        people_threshold: 7,
        duration_threshold: 10,
        ..CongestionConfig::default()
    };
    let orchestrator = Orchestrator::new(config).unwrap();

    let outcome = orchestrator.process_new_video(&video("gap")).await.unwrap();
    assert_eq!(outcome.windows_found, 1);
    let windows: Vec<CongestionWindow> =
        orchestrator.store().read_partition(&video("gap")).await.unwrap();
    assert_eq!((windows[0].start_second, windows[0].end_second), (0, 10));
    assert_eq!(windows[0].duration_seconds, 10);

    // Recording the gap as a quiet second splits the run
    let mut counts = counts;
    counts.insert(4, (4, 3));
    write_people(&dir, "gap", &counts).await;
    let outcome = orchestrator.process_new_video(&video("gap")).await.unwrap();
    assert_eq!(outcome.windows_found, 0);
}

#[tokio::test]
async fn test_retrain_with_known_keys_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    write_crowded_video(&dir, "plaza", &mixed_ratios(12)).await;
    let orchestrator = orchestrator(&dir, ClassifierMode::Baseline);
    orchestrator.process_new_video(&video("plaza")).await.unwrap();

    // Ground truth already covers every predicted second
    let predictions: Vec<ActivityPrediction> =
        orchestrator.store().read_partition(&video("plaza")).await.unwrap();
    let truth: Vec<LabeledTrainingRow> = predictions
        .iter()
        .map(|p| LabeledTrainingRow {
            is_pseudo_label: false,
            activity_label: Some(ActivityLabel::Sitting),
            ..p.to_pseudo_label()
        })
        .collect();
    orchestrator
        .store()
        .replace_partition(&video("plaza"), truth.clone())
        .await
        .unwrap();

    let outcome = orchestrator.retrain_from_feedback(&video("plaza")).await.unwrap();

    assert_eq!(outcome.rows_added, 0);
    assert!(!outcome.trained);
    assert!(outcome.warning.is_none());
    assert!(!orchestrator.store().has_model().await);
    let corpus: Vec<LabeledTrainingRow> = orchestrator.store().read_all().await.unwrap();
    assert_eq!(corpus, truth);
}

#[tokio::test]
async fn test_failed_retraining_keeps_appended_rows() {
    let dir = TempDir::new().unwrap();
    // Every second is sitting, so the corpus ends up with a single class
    write_crowded_video(&dir, "plaza", &[SITTING; 12]).await;
    let orchestrator = orchestrator(&dir, ClassifierMode::Baseline);
    orchestrator.process_new_video(&video("plaza")).await.unwrap();

    let outcome = orchestrator.retrain_from_feedback(&video("plaza")).await.unwrap();

    assert_eq!(outcome.rows_added, 12);
    assert!(!outcome.trained);
    assert!(outcome.report.is_none());
    let warning = outcome.warning.unwrap();
    assert_eq!(warning.rows_committed, 12);
    assert_eq!(warning.cause_kind, ErrorKind::StatisticalDegeneracy.as_str());
    assert!(warning.cause.contains("Statistically degenerate"));
    assert!(outcome.reason.unwrap().starts_with("Training failed"));

    let corpus: Vec<LabeledTrainingRow> = orchestrator.store().read_all().await.unwrap();
    assert_eq!(corpus.len(), 12);
    assert!(corpus.iter().all(|row| row.is_pseudo_label));
    assert!(!orchestrator.store().has_model().await);
}

#[tokio::test]
async fn test_retrain_appends_and_persists_artifacts() {
    let dir = TempDir::new().unwrap();
    write_crowded_video(&dir, "plaza", &mixed_ratios(12)).await;
    let orchestrator = orchestrator(&dir, ClassifierMode::Baseline);
    orchestrator
        .store()
        .replace_partition(&video("seed"), ground_truth("seed", 20))
        .await
        .unwrap();
    orchestrator.process_new_video(&video("plaza")).await.unwrap();

    let outcome = orchestrator.retrain_from_feedback(&video("plaza")).await.unwrap();

    assert_eq!(outcome.rows_added, 12);
    assert!(outcome.trained);
    assert!(outcome.warning.is_none());
    let report = outcome.report.unwrap();
    assert_eq!(report.train_size + report.test_size, 72);
    assert_eq!(report.seed, 42);

    assert!(orchestrator.load_model().await.is_ok());
    assert_eq!(orchestrator.store().read_feature_importance().await.unwrap().len(), 3);
    assert_eq!(orchestrator.store().read_training_report().await.unwrap(), report);

    // The same predictions again add nothing
    let again = orchestrator.retrain_from_feedback(&video("plaza")).await.unwrap();
    assert_eq!(again.rows_added, 0);
    assert!(!again.trained);
}

#[tokio::test]
async fn test_trained_model_labels_new_videos() {
    let dir = TempDir::new().unwrap();
    let trainer = orchestrator(&dir, ClassifierMode::Model);
    trainer
        .store()
        .replace_partition(&video("seed"), ground_truth("seed", 20))
        .await
        .unwrap();

    let trained = trainer.train_model().await.unwrap();
    assert_eq!(trained.labeled_rows, 60);
    assert_eq!(trained.feature_importance.len(), 3);

    write_crowded_video(&dir, "plaza", &[HIGH; 12]).await;
    let outcome = trainer.process_new_video(&video("plaza")).await.unwrap();
    assert_eq!(
        outcome.prediction_summary.unwrap().dominant_activity,
        ActivityLabel::HighActivity
    );
}

#[tokio::test]
async fn test_train_on_empty_corpus_is_degenerate() {
    let dir = TempDir::new().unwrap();
    let err = orchestrator(&dir, ClassifierMode::Model)
        .train_model()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StatisticalDegeneracy);
}

#[tokio::test]
async fn test_rebuild_feature_store_covers_every_video() {
    let dir = TempDir::new().unwrap();
    write_crowded_video(&dir, "video_a", &[SITTING; 12]).await;
    write_motion(&dir, "video_b", &[WALKING; 4]).await;
    write_people(&dir, "video_c", &[(0, 5), (1, 6)]).await;

    let orchestrator = orchestrator(&dir, ClassifierMode::Baseline);
    let outcome = orchestrator.rebuild_feature_store().await.unwrap();

    assert_eq!(outcome.videos, 3);
    assert_eq!(outcome.motion_rows, 16);
    assert_eq!(outcome.feature_rows, 18);

    let features: Vec<FeatureRow> = orchestrator.store().read_all().await.unwrap();
    let c: Vec<&FeatureRow> = features.iter().filter(|r| r.video() == &video("video_c")).collect();
    assert_eq!(c.len(), 2);
    assert_eq!(c[0].avg_motion_ratio, 0.0);
    assert_eq!(c[1].people_count, 6);

    let videos = orchestrator.list_videos().await.unwrap();
    assert_eq!(videos, vec![video("video_a"), video("video_b"), video("video_c")]);
}

#[tokio::test]
async fn test_video_summary() {
    let dir = TempDir::new().unwrap();
    write_crowded_video(&dir, "plaza", &[HIGH; 12]).await;
    let orchestrator = orchestrator(&dir, ClassifierMode::Baseline);
    orchestrator.process_new_video(&video("plaza")).await.unwrap();

    let summary = orchestrator.video_summary(&video("plaza")).await.unwrap();
    assert_eq!(summary.congestion_windows.len(), 1);
    assert_eq!(summary.crowd.unwrap().max_people, 12);
    assert!(summary.activity.is_some());
    assert!(!summary.insights.is_empty());

    let err = orchestrator.video_summary(&video("unknown")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingResource);
}
