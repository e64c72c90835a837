//! Per-video pipeline handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use parkwatch_models::{ProcessOutcome, RetrainOutcome, VideoId};
use parkwatch_worker::VideoSummary;

use crate::error::ApiResult;
use crate::state::AppState;

/// Run the full stage chain for one video.
pub async fn process_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<ProcessOutcome>> {
    let video = VideoId::new(video_id)?;
    let outcome = state.orchestrator.process_new_video(&video).await?;
    Ok(Json(outcome))
}

/// Feed the video's predictions back as pseudo labels and retrain.
///
/// A failed retraining is still a 200; the warning is in the body.
pub async fn retrain_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<RetrainOutcome>> {
    let video = VideoId::new(video_id)?;
    let outcome = state.orchestrator.retrain_from_feedback(&video).await?;
    Ok(Json(outcome))
}

#[derive(Serialize)]
pub struct VideoListResponse {
    pub videos: Vec<VideoId>,
}

pub async fn list_videos(State(state): State<AppState>) -> ApiResult<Json<VideoListResponse>> {
    let videos = state.orchestrator.list_videos().await?;
    Ok(Json(VideoListResponse { videos }))
}

pub async fn get_video_summary(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoSummary>> {
    let video = VideoId::new(video_id)?;
    let summary = state.orchestrator.video_summary(&video).await?;
    Ok(Json(summary))
}
