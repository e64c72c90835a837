//! File-backed storage for the ParkWatch pipeline.
//!
//! This crate provides:
//! - A CSV table store with partition-scoped upsert and per-table write locks
//! - Readers for the raw motion and person-count inputs
//! - Gzip-JSON model artifact storage with version checks
//! - Feature-importance and training-report persistence

pub mod artifacts;
pub mod error;
pub mod fs_utils;
pub mod layout;
pub mod sources;
pub mod table_store;

pub use artifacts::{compress_artifact, decompress_artifact, VersionedArtifact};
pub use error::{StorageError, StorageResult};
pub use layout::DataLayout;
pub use sources::{CsvSampleSource, SampleSource};
pub use table_store::{TableStore, UpsertStats};
