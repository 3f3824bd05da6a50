//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::repository::RepositoryError;
use crate::scheduler::SchedulerError;
use crate::services::{AccountError, CatalogError};

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Invalid request (validation error or illegal status transition)
    BadRequest(String),
    /// Missing or unresolvable caller identity
    Unauthorized(String),
    /// Caller lacks rights for the operation
    Forbidden(String),
    /// Resource not found
    NotFound(String),
    /// Slot or uniqueness conflict
    Conflict(String),
    /// Internal server error
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg)),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, ApiError::new("UNAUTHORIZED", msg))
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, ApiError::new("FORBIDDEN", msg)),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ApiError::new("CONFLICT", msg)),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ApiError::new("INTERNAL_ERROR", msg))
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Validation(msg) => AppError::BadRequest(msg),
            SchedulerError::InvalidState(msg) => AppError::BadRequest(msg),
            SchedulerError::NotFound(msg) => AppError::NotFound(msg),
            SchedulerError::Permission(msg) => AppError::Forbidden(msg),
            SchedulerError::Conflict(msg) => AppError::Conflict(msg),
            SchedulerError::Repository(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(msg) => AppError::BadRequest(msg),
            AccountError::Conflict(msg) => AppError::Conflict(msg),
            AccountError::InvalidCredentials => {
                AppError::Unauthorized("invalid credentials".to_string())
            }
            AccountError::Repository(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(msg) => AppError::BadRequest(msg),
            CatalogError::NotFound(msg) => AppError::NotFound(msg),
            CatalogError::Permission(msg) => AppError::Forbidden(msg),
            CatalogError::Repository(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { .. } => AppError::NotFound(err.to_string()),
            RepositoryError::Conflict { .. } => AppError::Conflict(err.to_string()),
            RepositoryError::Validation { .. } => AppError::BadRequest(err.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
