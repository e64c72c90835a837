//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use parkwatch_models::InvalidVideoId;
use parkwatch_worker::{ErrorKind, WorkerError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] WorkerError),

    #[error("Invalid video id: {0}")]
    InvalidVideoId(#[from] InvalidVideoId),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Pipeline(e) => e.kind(),
            ApiError::InvalidVideoId(_) => ErrorKind::InvalidVideoId,
            ApiError::Config(_) => ErrorKind::Configuration,
            ApiError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InputFormat => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::MissingResource => StatusCode::NOT_FOUND,
            ErrorKind::StatisticalDegeneracy => StatusCode::CONFLICT,
            ErrorKind::InvalidVideoId => StatusCode::BAD_REQUEST,
            ErrorKind::Configuration | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    kind: ErrorKind,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.kind();

        // Don't expose internal error details in production
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Request failed");
            if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                "An internal error occurred".to_string()
            } else {
                self.to_string()
            }
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { detail, kind })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkwatch_models::VideoId;
    use parkwatch_worker::Stage;

    #[test]
    fn test_status_codes_follow_error_kind() {
        let video = VideoId::new("plaza").unwrap();
        let failed = ApiError::from(
            WorkerError::config_error("x").in_stage(&video, Stage::Prediction),
        );
        assert_eq!(failed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let invalid = ApiError::from(VideoId::new("a b").unwrap_err());
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
    }
}
