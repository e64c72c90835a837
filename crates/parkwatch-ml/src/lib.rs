//! Activity classifiers for the ParkWatch pipeline.
//!
//! This crate provides:
//! - A stateless threshold baseline on `avg_motion_ratio`
//! - A random forest with class-balanced weighting, trained on a seeded
//!   stratified split
//! - The held-out classification report and feature-importance ranking
//! - The versioned model artifact

pub mod baseline;
pub mod classifier;
pub mod error;
pub mod forest;
pub mod metrics;
pub mod model;
pub mod split;
pub mod trainer;
pub mod tree;

pub use baseline::{BaselineClassifier, BaselineThresholds};
pub use classifier::ActivityClassifier;
pub use error::{MlError, MlResult};
pub use forest::{ForestParams, RandomForest};
pub use model::{rank_features, ActivityModel, MODEL_VERSION};
pub use split::{stratified_split, Split};
pub use trainer::{train_model, TrainedModel, TrainingConfig};
