//! Error handling for the REST API server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mindcord_core::MindcordError;
use serde::Serialize;
use std::fmt;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    // Common error constructors
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<MindcordError> for ApiError {
    fn from(err: MindcordError) -> Self {
        let status = match &err {
            MindcordError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            MindcordError::NotFound { .. } => StatusCode::NOT_FOUND,
            MindcordError::Configuration(_) | MindcordError::UnsupportedProvider { .. } => {
                StatusCode::BAD_REQUEST
            }
            MindcordError::StorageUnavailable { .. } | MindcordError::Io(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            MindcordError::Generation { .. } | MindcordError::Delivery { .. } => {
                StatusCode::BAD_GATEWAY
            }
            MindcordError::Serialization(_) | MindcordError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let message = match err.suggestion() {
            Some(hint) if matches!(err, MindcordError::Validation { .. }) => {
                format!("{} ({})", err, hint)
            }
            _ => err.to_string(),
        };
        Self::new(status, err.code().as_str(), message)
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
