//! Error-to-HTTP response conversion.
//!
//! Handlers return `Result<_, AppError>`; every [`reelhouse_common::Error`]
//! converts into one with the status its class maps to.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reelhouse_common::Error;
use serde_json::json;

/// An error on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    pub fn busy() -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "busy", "server too busy")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Client-facing text stays generic: paths and OS errors are for the log only
        let (code, message) = match &e {
            Error::PathOutsideRoot { .. } => ("forbidden", "forbidden"),
            Error::UnsupportedMode(_) => ("unsupported_mode", "configuration error: unsupported mode"),
            Error::NotFound(_) => ("not_found", "entry not found"),
            Error::VolumeNotFound(_) => ("volume_unavailable", "storage volume unavailable"),
            Error::LimiterCancelled => ("busy", "server too busy"),
            Error::InvalidInput(_) => ("invalid_input", "invalid request"),
            Error::Io(_) if e.is_not_found() => ("not_found", "file not found"),
            Error::Io(_) => ("io_error", "file access error"),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %e, "Server error in handler");
        }

        Self::new(status, code, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.message,
            "code": self.code,
        });

        (self.status, axum::Json(body)).into_response()
    }
}
