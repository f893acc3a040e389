use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Service-level error type
#[derive(Debug, Error)]
pub enum StreamflowError {
    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session {0} has shut down")]
    SessionClosed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StreamflowError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StreamflowError::VideoNotFound(_) | StreamflowError::SessionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            StreamflowError::SessionClosed(_) => StatusCode::GONE,
            StreamflowError::InvalidRequest(_) | StreamflowError::InvalidUrl(_) => {
                StatusCode::BAD_REQUEST
            }
            StreamflowError::Io(_) | StreamflowError::Json(_) | StreamflowError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for StreamflowError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, StreamflowError>;
