//! Axum HTTP API over the ParkWatch pipeline.
//!
//! This crate provides:
//! - Endpoints for the two orchestrator entrypoints and initial training
//! - Read-only video listing and summaries
//! - Request ids, request logging and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
