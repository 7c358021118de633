use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use compute::{ComputeError, DenialReason};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tracing::{error, warn};

use crate::schemas::ErrorResponse;

/// Errors returned by every handler, mapped onto HTTP statuses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, invalid or revoked token, or bad credentials
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated, but the role may not call this endpoint
    #[error("{0}")]
    UnauthorizedRole(String),

    /// Right role, but the target is outside the caller's scope
    #[error("Access denied: {0}")]
    Forbidden(DenialReason),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidArgument(String),

    /// Version mismatch or duplicate key; safe to retry after re-reading
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            ApiError::UnauthorizedRole(_) => (StatusCode::FORBIDDEN, "UNAUTHORIZED_ROLE"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN_SCOPE"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let reason = match &self {
            ApiError::Forbidden(reason) => Some(reason.as_str().to_string()),
            _ => None,
        };
        // Internal details stay in the logs
        let message = match &self {
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            reason,
            success: false,
        };
        (status, Json(body)).into_response()
    }
}

impl From<ComputeError> for ApiError {
    fn from(err: ComputeError) -> Self {
        match err {
            ComputeError::Database(db_err) => ApiError::from(db_err),
            ComputeError::NotFound(message) => ApiError::NotFound(message),
            ComputeError::InvalidArgument(message) => ApiError::InvalidArgument(message),
            ComputeError::Conflict(message) => ApiError::Conflict(message),
            ComputeError::Denied(reason) => ApiError::Forbidden(reason),
            ComputeError::Import(message) => ApiError::InvalidArgument(message),
            ComputeError::Render(message) | ComputeError::Credential(message) => {
                error!("Compute failure: {}", message);
                ApiError::Internal(message)
            }
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                warn!("Unique constraint violated: {}", detail);
                ApiError::Conflict("A record with the same key already exists".to_string())
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                warn!("Foreign key constraint violated: {}", detail);
                ApiError::Conflict("The record is referenced by or references missing data".to_string())
            }
            _ => {
                error!("Database error: {}", err);
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::InvalidArgument(err.to_string())
    }
}
