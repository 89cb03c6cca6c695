//! Error types for the Stacks server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::document::ExtractError;
use crate::storage::StorageError;
use crate::upload::StagingError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("No upload available: {0}")]
    MissingUploadContext(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::UnsupportedFormat(format) => AppError::UnsupportedFormat(format),
            ExtractError::MalformedDocument(msg) => AppError::MalformedDocument(msg),
            ExtractError::Timeout(secs) => AppError::Timeout(secs),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<StagingError> for AppError {
    fn from(err: StagingError) -> Self {
        match err {
            StagingError::Full { .. } => AppError::Unavailable(err.to_string()),
            _ => AppError::MissingUploadContext(err.to_string()),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::UnsupportedFormat(_) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_format",
                "Unsupported file format".to_string(),
            ),
            AppError::MalformedDocument(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "malformed_document",
                msg.clone(),
            ),
            AppError::MissingUploadContext(msg) => {
                (StatusCode::NOT_FOUND, "missing_upload", msg.clone())
            }
            AppError::Timeout(secs) => (
                StatusCode::GATEWAY_TIMEOUT,
                "timeout",
                format!("Operation timed out after {} seconds", secs),
            ),
            AppError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                msg.clone(),
            ),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                match e {
                    StorageError::AlreadyExists(path) => (
                        StatusCode::CONFLICT,
                        "conflict",
                        format!("A document already exists at {}", path),
                    ),
                    StorageError::InvalidPathComponent(component) => (
                        StatusCode::BAD_REQUEST,
                        "bad_request",
                        format!("Invalid name for a library path: {:?}", component),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "storage_error",
                        "Storage error".to_string(),
                    ),
                }
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Database error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
