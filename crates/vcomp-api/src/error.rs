//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use vcomp_worker::WorkerError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Worker(e) => match e {
                WorkerError::InvalidOverlays(_) | WorkerError::NotReady { .. } => {
                    StatusCode::BAD_REQUEST
                }
                WorkerError::JobNotFound(_) | WorkerError::ArtifactMissing(_) => {
                    StatusCode::NOT_FOUND
                }
                WorkerError::InvalidTransition { .. }
                | WorkerError::Storage(_)
                | WorkerError::Media(_)
                | WorkerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl From<vcomp_models::ModelError> for ApiError {
    fn from(e: vcomp_models::ModelError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

/// JSON error body.
#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let detail = match &self {
            ApiError::Worker(WorkerError::JobNotFound(_)) => "Job not found".to_string(),
            ApiError::Worker(WorkerError::ArtifactMissing(_)) => "Output file not found".to_string(),
            ApiError::Worker(WorkerError::NotReady { .. }) => "Job not completed".to_string(),
            other => other.to_string(),
        };

        if self.is_internal() {
            tracing::error!("Request failed: {}", self);
        }

        (status, Json(ErrorResponse { detail })).into_response()
    }
}
