//! API error handling.
//!
//! Every failure leaves the server as `{ "code", "message" }` JSON. Internal
//! details are logged, never returned.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use vidconv_core::{ErrorKind, LifecycleError};

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
}

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

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorResponse {
            success: false,
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        let code = err.code();
        match err.kind() {
            ErrorKind::Client => {
                let status = match err {
                    LifecycleError::UnsupportedFormat { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    LifecycleError::SizeLimitExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                    _ => StatusCode::BAD_REQUEST,
                };
                ApiError::new(status, code, err.to_string())
            }
            ErrorKind::NotFound => ApiError::new(StatusCode::NOT_FOUND, code, err.to_string()),
            ErrorKind::External => {
                tracing::warn!(error = %err, "conversion request failed");
                ApiError::new(
                    StatusCode::BAD_GATEWAY,
                    code,
                    "Conversion failed; the uploaded file was kept and can be retried",
                )
            }
            ErrorKind::Internal => {
                tracing::error!(error = %err, "internal error while handling request");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, code, "An internal error occurred")
            }
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
