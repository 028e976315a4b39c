//! HTTP error mapping
//!
//! Every handler returns [`ApiResult`]. Client mistakes become 400/404 with a
//! message; internal failures are logged here and answered with a generic
//! body.

use crate::fixes::FixError;
use crate::pipeline::PipelineError;
use crate::profile::ProfileError;
use crate::session::{ArchiveError, SessionError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Detail is logged, never sent to the client
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(detail) => {
                error!("Request failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => ApiError::NotFound(err.to_string()),
            SessionError::InvalidPath(_) => ApiError::BadRequest(err.to_string()),
            SessionError::Archive(ArchiveError::Io(e)) => {
                ApiError::Internal(format!("archive extraction: {}", e))
            }
            SessionError::Archive(_) => ApiError::BadRequest(err.to_string()),
            SessionError::Io(e) => ApiError::Internal(format!("session storage: {}", e)),
        }
    }
}

impl From<ArchiveError> for ApiError {
    fn from(err: ArchiveError) -> Self {
        SessionError::Archive(err).into()
    }
}

impl From<FixError> for ApiError {
    fn from(err: FixError) -> Self {
        match err {
            FixError::NotFound(_) => ApiError::NotFound("File not found".to_string()),
            FixError::Io { .. } => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::InvalidUserId(_) => ApiError::BadRequest(err.to_string()),
            ProfileError::Corrupt { .. } | ProfileError::Io(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("background task failed: {}", err))
    }
}
