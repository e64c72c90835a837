//! Model artifact, feature-importance table and training report storage.
//!
//! The model is stored as gzip-compressed JSON. Artifacts carry a format
//! version; a file written by an incompatible version is reported as a
//! missing model rather than loaded.

use std::io::{Read, Write};

use csv::WriterBuilder;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use parkwatch_models::{ClassificationReport, FeatureImportance};

use crate::error::{StorageError, StorageResult};
use crate::fs_utils::{read_optional, write_atomic};
use crate::table_store::TableStore;

const MODEL_LOCK: &str = "model";
const FEATURE_IMPORTANCE_LOCK: &str = "feature_importance";
const TRAINING_REPORT_LOCK: &str = "training_report";

/// A persisted artifact with a format version.
pub trait VersionedArtifact: Serialize + DeserializeOwned {
    /// Version written by this build.
    const CURRENT_VERSION: u32;

    fn version(&self) -> u32;

    fn is_current_version(&self) -> bool {
        self.version() == Self::CURRENT_VERSION
    }
}

/// Serialize and gzip an artifact.
pub fn compress_artifact<A: Serialize>(artifact: &A) -> StorageResult<Vec<u8>> {
    let json = serde_json::to_vec(artifact)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| StorageError::Serialization(format!("Failed to gzip artifact: {}", e)))?;

    encoder
        .finish()
        .map_err(|e| StorageError::Serialization(format!("Failed to finish gzip encoding: {}", e)))
}

/// Gunzip and deserialize an artifact.
pub fn decompress_artifact<A: DeserializeOwned>(data: &[u8]) -> StorageResult<A> {
    let mut decoder = GzDecoder::new(data);
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(|e| StorageError::Serialization(format!("Failed to decompress artifact: {}", e)))?;

    Ok(serde_json::from_slice(&json)?)
}

impl TableStore {
    /// Persist the trained model, replacing any previous one.
    pub async fn save_model<A: VersionedArtifact>(&self, model: &A) -> StorageResult<()> {
        let lock = self.table_lock(MODEL_LOCK).await;
        let _guard = lock.lock().await;

        let path = self.layout().model_path();
        let bytes = compress_artifact(model)?;
        write_atomic(&path, &bytes).await?;

        info!(
            path = %path.display(),
            bytes = bytes.len(),
            version = model.version(),
            "Saved model artifact"
        );
        Ok(())
    }

    /// Load the trained model.
    ///
    /// Absent, unreadable and outdated artifacts are all `NotFound`.
    pub async fn load_model<A: VersionedArtifact>(&self) -> StorageResult<A> {
        let path = self.layout().model_path();
        let Some(bytes) = read_optional(&path).await? else {
            return Err(StorageError::not_found(format!(
                "model artifact {}",
                path.display()
            )));
        };

        let model: A = decompress_artifact(&bytes).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Model artifact is unreadable");
            StorageError::not_found(format!(
                "model artifact {} is unreadable: {}",
                path.display(),
                e
            ))
        })?;

        if !model.is_current_version() {
            return Err(StorageError::not_found(format!(
                "model artifact {} has version {}, expected {}",
                path.display(),
                model.version(),
                A::CURRENT_VERSION
            )));
        }

        Ok(model)
    }

    /// Whether a model artifact file exists.
    pub async fn has_model(&self) -> bool {
        tokio::fs::try_exists(self.layout().model_path())
            .await
            .unwrap_or(false)
    }

    /// Persist the feature-importance ranking as `rank,feature,importance`.
    pub async fn write_feature_importance(
        &self,
        ranking: &[FeatureImportance],
    ) -> StorageResult<()> {
        let lock = self.table_lock(FEATURE_IMPORTANCE_LOCK).await;
        let _guard = lock.lock().await;

        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer
            .write_record(["rank", "feature", "importance"])
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        for entry in ranking {
            writer
                .serialize(entry)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        write_atomic(self.layout().feature_importance_path(), &bytes).await
    }

    pub async fn read_feature_importance(&self) -> StorageResult<Vec<FeatureImportance>> {
        let path = self.layout().feature_importance_path();
        let Some(bytes) = read_optional(&path).await? else {
            return Err(StorageError::not_found(format!(
                "feature importance {}",
                path.display()
            )));
        };

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        reader
            .deserialize()
            .map(|row| row.map_err(|e| StorageError::csv(&path, e)))
            .collect()
    }

    /// Persist the latest training report as pretty JSON.
    pub async fn write_training_report(&self, report: &ClassificationReport) -> StorageResult<()> {
        let lock = self.table_lock(TRAINING_REPORT_LOCK).await;
        let _guard = lock.lock().await;

        let json = serde_json::to_vec_pretty(report)?;
        write_atomic(self.layout().training_report_path(), &json).await
    }

    pub async fn read_training_report(&self) -> StorageResult<ClassificationReport> {
        let path = self.layout().training_report_path();
        let Some(bytes) = read_optional(&path).await? else {
            return Err(StorageError::not_found(format!(
                "training report {}",
                path.display()
            )));
        };
        Ok(serde_json::from_slice(&bytes)?)
    }
}
