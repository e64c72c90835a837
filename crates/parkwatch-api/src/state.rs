//! Application state.

use parkwatch_worker::{Orchestrator, PipelineConfig};

use crate::config::ApiConfig;
use crate::error::ApiResult;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(config: ApiConfig, pipeline: PipelineConfig) -> ApiResult<Self> {
        let orchestrator = Orchestrator::new(pipeline)?;
        Ok(Self {
            config,
            orchestrator,
        })
    }
}
