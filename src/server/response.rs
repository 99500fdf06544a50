use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::Error;

/// API error that converts to a proper HTTP response
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound => ApiError::not_found("Not found"),
            Error::Conflict => ApiError::conflict("Already exists"),
            Error::UnsupportedFormat(name) => {
                ApiError::bad_request(format!("Unsupported format: {name}"))
            }
            Error::BadRequest(msg) => ApiError::bad_request(msg),
            Error::ArchiveCorrupt(msg) => ApiError::bad_request(format!("Invalid archive: {msg}")),
            Error::Database(e) => {
                tracing::error!("Database error: {e}");
                ApiError::internal("Internal server error")
            }
            Error::Io(e) => {
                tracing::error!("IO error: {e}");
                ApiError::internal("Internal server error")
            }
            Error::Decode(e) => {
                tracing::error!("Decode error: {e}");
                ApiError::internal("Internal server error")
            }
            Error::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                ApiError::internal("Internal server error")
            }
        }
    }
}
