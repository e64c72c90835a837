//! On-disk layout of the data directory.

use std::path::{Path, PathBuf};

use parkwatch_models::VideoId;

/// Resolves every table, raw input and artifact path under one root.
///
/// ```text
/// {root}/processed/{table}.csv
/// {root}/processed/motion_raw/{video}_motion.csv
/// {root}/processed/people_per_second/{video}_people.csv
/// {root}/processed/feature_importance.csv
/// {root}/processed/training_report.json
/// {root}/models/activity_rf_model.json.gz
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub const MOTION_SUFFIX: &'static str = "_motion.csv";
    pub const PEOPLE_SUFFIX: &'static str = "_people.csv";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("processed")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join("models")
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.processed_dir().join(format!("{}.csv", table))
    }

    pub fn motion_raw_dir(&self) -> PathBuf {
        self.processed_dir().join("motion_raw")
    }

    pub fn people_dir(&self) -> PathBuf {
        self.processed_dir().join("people_per_second")
    }

    pub fn motion_raw_path(&self, video: &VideoId) -> PathBuf {
        self.motion_raw_dir()
            .join(format!("{}{}", video, Self::MOTION_SUFFIX))
    }

    pub fn people_path(&self, video: &VideoId) -> PathBuf {
        self.people_dir()
            .join(format!("{}{}", video, Self::PEOPLE_SUFFIX))
    }

    pub fn feature_importance_path(&self) -> PathBuf {
        self.processed_dir().join("feature_importance.csv")
    }

    pub fn training_report_path(&self) -> PathBuf {
        self.processed_dir().join("training_report.json")
    }

    pub fn model_path(&self) -> PathBuf {
        self.models_dir().join("activity_rf_model.json.gz")
    }
}
