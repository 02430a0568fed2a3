//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`rc_core::Error`] so that route handlers
//! can return `Result<T, AppError>` and use `?` on core results.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError(rc_core::Error);

impl AppError {
    pub fn new(inner: rc_core::Error) -> Self {
        Self(inner)
    }

    pub fn inner(&self) -> &rc_core::Error {
        &self.0
    }
}

impl From<rc_core::Error> for AppError {
    fn from(e: rc_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "Server error in API handler");
        } else {
            tracing::debug!(status = %status, error = %self.0, "Request rejected");
        }

        let code = match &self.0 {
            rc_core::Error::NotFound { .. } => "not_found",
            rc_core::Error::Forbidden(_) => "forbidden",
            rc_core::Error::Validation(_) => "validation_error",
            rc_core::Error::Timeout { .. } => "timeout",
            rc_core::Error::Tool { .. } => "engine_error",
            rc_core::Error::Io { .. } => "io_error",
            rc_core::Error::Internal(_) => "internal_error",
        };

        let body = json!({
            "error": self.0.to_string(),
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
