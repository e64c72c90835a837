//! Pipeline configuration.

use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use parkwatch_analytics::{CongestionConfig, GapPolicy};
use parkwatch_ml::{BaselineThresholds, TrainingConfig};
use parkwatch_storage::DataLayout;

use crate::error::{WorkerError, WorkerResult};

/// Which classifier labels new videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    /// Trained model; a missing artifact fails the run
    #[default]
    Model,
    Baseline,
    /// Trained model, falling back to the baseline while none exists
    ModelOrBaseline,
}

impl FromStr for ClassifierMode {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "model" => Ok(Self::Model),
            "baseline" => Ok(Self::Baseline),
            "model_or_baseline" => Ok(Self::ModelOrBaseline),
            other => Err(WorkerError::config_error(format!(
                "unknown classifier mode '{}'",
                other
            ))),
        }
    }
}

/// Pipeline configuration, built once and shared by every component.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    /// Root of the raw inputs, derived tables and model artifact
    pub data_dir: PathBuf,
    pub congestion: CongestionConfig,
    pub baseline: BaselineThresholds,
    pub training: TrainingConfig,
    pub classifier: ClassifierMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            congestion: CongestionConfig::default(),
            baseline: BaselineThresholds::default(),
            training: TrainingConfig::default(),
            classifier: ClassifierMode::default(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    ///
    /// Unset variables keep their defaults; unparsable ones are an error.
    pub fn from_env() -> WorkerResult<Self> {
        let defaults = Self::default();

        let data_dir = std::env::var("PARKWATCH_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let congestion = CongestionConfig {
            people_threshold: env_parse(
                "PARKWATCH_PEOPLE_THRESHOLD",
                defaults.congestion.people_threshold,
            )?,
            duration_threshold: env_parse(
                "PARKWATCH_DURATION_THRESHOLD",
                defaults.congestion.duration_threshold,
            )?,
            gap_policy: match std::env::var("PARKWATCH_CONGESTION_GAP_POLICY") {
                Ok(raw) => raw.parse::<GapPolicy>().map_err(|e| {
                    WorkerError::config_error(format!("PARKWATCH_CONGESTION_GAP_POLICY: {}", e))
                })?,
                Err(_) => defaults.congestion.gap_policy,
            },
        };

        let baseline = BaselineThresholds {
            low: env_parse("PARKWATCH_BASELINE_LOW", defaults.baseline.low)?,
            high: env_parse("PARKWATCH_BASELINE_HIGH", defaults.baseline.high)?,
        };

        let training = TrainingConfig {
            test_fraction: env_parse("PARKWATCH_TEST_FRACTION", defaults.training.test_fraction)?,
            seed: env_parse("PARKWATCH_SEED", defaults.training.seed)?,
            n_estimators: env_parse("PARKWATCH_N_ESTIMATORS", defaults.training.n_estimators)?,
            ..defaults.training
        };

        let classifier = env_parse("PARKWATCH_CLASSIFIER", defaults.classifier)?;

        let config = Self {
            data_dir,
            congestion,
            baseline,
            training,
            classifier,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> WorkerResult<()> {
        self.congestion
            .validate()
            .map_err(|e| WorkerError::config_error(e.to_string()))?;
        self.baseline
            .validate()
            .map_err(|e| WorkerError::config_error(e.to_string()))?;
        self.training
            .validate()
            .map_err(|e| WorkerError::config_error(e.to_string()))?;
        Ok(())
    }

    pub fn layout(&self) -> DataLayout {
        DataLayout::new(self.data_dir.clone())
    }
}

fn env_parse<T>(name: &str, default: T) -> WorkerResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e| {
            WorkerError::config_error(format!("{}='{}' is invalid: {}", name, raw, e))
        }),
        Err(_) => Ok(default),
    }
}
