//! # Centralized Error Handling
//!
//! This module defines the application-wide error type [`AppError`] used consistently
//! across the gateway, stores, and HTTP handlers. It follows the `thiserror` pattern.
//!
//! ## Error Categories
//!
//! 1. **Client Errors** (4xx)
//!    - [`Authentication`](AppError::Authentication) → 401 Unauthorized
//!    - [`Forbidden`](AppError::Forbidden) → 403 Forbidden
//!    - [`InvalidInput`](AppError::InvalidInput) → 400 Bad Request
//!    - [`NotFound`](AppError::NotFound) → 404 Not Found
//!
//! 2. **Server Errors** (5xx)
//!    - [`Upstream`](AppError::Upstream) → 502 Bad Gateway (generative service)
//!    - [`Config`](AppError::Config), [`Decoding`](AppError::Decoding),
//!      [`Internal`](AppError::Internal) → 500 Internal Server Error
//!
//! ## Usage Example
//!
//! ```rust
//! use lib_core::error::{AppError, Result};
//!
//! fn parse_segment(segment: &str) -> Result<&str> {
//!     if segment.is_empty() {
//!         return Err(AppError::InvalidInput("Path cannot be empty".to_string()));
//!     }
//!     Ok(segment)
//! }
//! ```

use crate::dto::file_tree::FileTreeError;
use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

/// Convenience type alias for `Result<T, AppError>`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application-wide error type covering all error scenarios.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or rejected credential, or malformed handshake parameters.
    ///
    /// **HTTP Status**: 401 Unauthorized
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Verified identity that is not allowed to act on the resource.
    ///
    /// **HTTP Status**: 403 Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Configuration error during startup or environment loading.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generative service failure (network, quota, timeout).
    ///
    /// **HTTP Status**: 502 Bad Gateway
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Stored or submitted data that could not be decoded.
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Invalid user input validation error.
    ///
    /// **HTTP Status**: 400 Bad Request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error (unexpected failures).
    #[error("Internal error: {0}")]
    Internal(String),

    /// Requested resource not found.
    ///
    /// **HTTP Status**: 404 Not Found
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) | AppError::Internal(_) | AppError::Decoding(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a user-friendly error message.
    ///
    /// For internal errors, returns a generic message to avoid exposing implementation details.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Authentication(msg)
            | AppError::Forbidden(msg)
            | AppError::InvalidInput(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::Upstream(_) => "Service temporarily unavailable".to_string(),
            AppError::Config(_) | AppError::Internal(_) | AppError::Decoding(_) => {
                "An internal error occurred".to_string()
            }
        }
    }

    /// Variant name, used as the machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Authentication(_) => "AuthenticationError",
            AppError::Forbidden(_) => "Forbidden",
            AppError::Config(_) => "Config",
            AppError::Upstream(_) => "Upstream",
            AppError::Decoding(_) => "Decoding",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Internal(_) => "Internal",
            AppError::NotFound(_) => "NotFoundError",
        }
    }
}

/// Implement Axum's `IntoResponse` for automatic error handling.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match status {
            StatusCode::BAD_GATEWAY | StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Server error: {}", self);
            }
            _ => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let body = Json(json!({
            "error": self.user_message(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Convert `sqlx::Error` to `AppError`.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Database record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                AppError::Internal(format!("Database error: {}", db_err.message()))
            }
            _ => AppError::Internal(format!("Database error: {}", err)),
        }
    }
}

/// Convert `serde_json::Error` to `AppError`.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decoding(format!("JSON error: {}", err))
    }
}

impl From<FileTreeError> for AppError {
    fn from(err: FileTreeError) -> Self {
        match err {
            FileTreeError::EmptyPath => AppError::InvalidInput(err.to_string()),
            FileTreeError::NotFound(_) => AppError::NotFound("File not found".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Authentication("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Upstream("x".into()).status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let err = AppError::Internal("disk on fire".into());
        assert_eq!(err.user_message(), "An internal error occurred");
    }

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let err: AppError = FileTreeError::NotFound("a/b".into()).into();
        assert_eq!(err.code(), "NotFoundError");
    }
}
