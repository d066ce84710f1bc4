//! HTTP error mapping.
//!
//! Clients see either their own input error or a generic retryable message.
//! Backend details stay in the server log.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

/// Body returned for every hard failure that is not the caller's fault.
pub const RETRYABLE_MESSAGE: &str = "search temporarily unavailable, retry";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Unavailable(scout_core::Error),
}

impl From<scout_core::Error> for ApiError {
    fn from(err: scout_core::Error) -> Self {
        match err {
            scout_core::Error::MalformedRequest(msg) => ApiError::BadRequest(msg),
            scout_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            other => ApiError::Unavailable(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unavailable(err) => {
                error!(
                    subsystem = "api",
                    error = %err,
                    recoverable = err.is_recoverable(),
                    "Request failed"
                );
                (StatusCode::SERVICE_UNAVAILABLE, RETRYABLE_MESSAGE.to_string())
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
