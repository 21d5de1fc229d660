//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use relaygate_types::error::{CredentialSyncError, RepositoryError, RotationError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Rotation step failures.
    Rotation(RotationError),
    /// Storage failures outside rotation.
    Repository(RepositoryError),
    /// Authentication failure.
    Unauthorized(String),
    /// Validation error.
    Validation(String),
    /// Requested entity does not exist.
    NotFound(String),
}

impl From<RotationError> for AppError {
    fn from(e: RotationError) -> Self {
        AppError::Rotation(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Repository(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Rotation(RotationError::UnknownStep(step)) => (
                StatusCode::BAD_REQUEST,
                "UNKNOWN_STEP",
                format!("Unknown rotation step '{step}'"),
            ),
            AppError::Rotation(e @ RotationError::NotConfigured(_)) => {
                (StatusCode::BAD_REQUEST, "NOT_CONFIGURED", e.to_string())
            }
            AppError::Rotation(e @ RotationError::MissingPendingSecret { .. }) => {
                (StatusCode::CONFLICT, "MISSING_PENDING_SECRET", e.to_string())
            }
            AppError::Rotation(RotationError::Consumer(e @ CredentialSyncError::Unreachable(_))) => {
                (StatusCode::SERVICE_UNAVAILABLE, "CONSUMER_UNAVAILABLE", e.to_string())
            }
            AppError::Rotation(RotationError::Consumer(e)) => {
                (StatusCode::BAD_GATEWAY, "CONSUMER_ERROR", e.to_string())
            }
            AppError::Rotation(RotationError::Storage(RepositoryError::NotFound)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", "Secret version not found".to_string())
            }
            AppError::Rotation(RotationError::Storage(e)) | AppError::Repository(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", e.to_string())
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(code, error = %message, "request failed");
        }

        let body = json!({
            "data": null,
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
