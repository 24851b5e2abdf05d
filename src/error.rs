//! Error handling module
//!
//! Provides unified error types and handling for the entire application.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Edit token does not match the stored record
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Expired: {0}")]
    Expired(String),

    /// Remote backend not configured; the service runs local-only
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Remote backend unreachable, timed out or failing server-side
    #[error("Remote error: {0}")]
    Remote(String),

    /// Remote backend refused the call or answered with unusable data
    #[error("Remote rejected: {0}")]
    RemoteRejected(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors worth retrying on the next sync cycle
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Remote(_) | AppError::Pool(_))
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match &self {
            AppError::Database(e) => {
                error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    Some(e.to_string()),
                )
            }
            AppError::Pool(e) => {
                error!("Pool error: {:?}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "POOL_EXHAUSTED",
                    "Database connection pool exhausted".to_string(),
                    Some(e.to_string()),
                )
            }
            AppError::Serialization(e) => {
                error!("Serialization error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SERIALIZATION_ERROR",
                    "A stored proposal could not be read".to_string(),
                    Some(e.to_string()),
                )
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                None,
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
                None,
            ),
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                msg.clone(),
                None,
            ),
            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                "EDIT_TOKEN_MISMATCH",
                "Unable to save proposal".to_string(),
                Some(msg.clone()),
            ),
            AppError::InvalidTransition(msg) => (
                StatusCode::CONFLICT,
                "INVALID_TRANSITION",
                msg.clone(),
                None,
            ),
            AppError::Expired(msg) => (
                StatusCode::GONE,
                "PROPOSAL_EXPIRED",
                msg.clone(),
                None,
            ),
            AppError::NotConfigured(msg) => {
                warn!("Remote backend not configured: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "NOT_CONFIGURED",
                    msg.clone(),
                    None,
                )
            }
            AppError::Remote(msg) => {
                warn!("Remote backend error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "REMOTE_ERROR",
                    "The remote backend could not be reached".to_string(),
                    Some(msg.clone()),
                )
            }
            AppError::RemoteRejected(msg) => {
                warn!("Remote backend rejected a call: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "REMOTE_REJECTED",
                    "The remote backend refused the request".to_string(),
                    Some(msg.clone()),
                )
            }
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    Some(msg.clone()),
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            error: details,
            code: Some(error_code.to_string()),
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;

/// Helper function to create a validation error
pub fn validation_error(msg: impl Into<String>) -> AppError {
    AppError::Validation(msg.into())
}

/// Helper function to create a not found error
pub fn not_found_error(msg: impl Into<String>) -> AppError {
    AppError::NotFound(msg.into())
}
