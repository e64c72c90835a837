//! Model training handler.

use axum::extract::State;
use axum::Json;

use parkwatch_models::TrainOutcome;

use crate::error::ApiResult;
use crate::state::AppState;

/// Train from the labeled corpus and replace the model artifacts.
pub async fn train_model(State(state): State<AppState>) -> ApiResult<Json<TrainOutcome>> {
    let outcome = state.orchestrator.train_model().await?;
    Ok(Json(outcome))
}
