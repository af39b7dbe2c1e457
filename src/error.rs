//! Error types for Blogfed
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// Federation workflows mostly log these and move on; only the
/// discovery endpoints and startup surface them to a caller.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// Malformed request or remote document (400)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Signing key file could not be read (500)
    #[error("Failed to load signing key: {0}")]
    KeyLoad(String),

    /// Signing key could not be decoded (500)
    #[error("Failed to parse signing key: {0}")]
    KeyParse(String),

    /// Request signing failed (500)
    #[error("Signing error: {0}")]
    Signing(String),

    /// Activity could not be serialized (500)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote unreachable (502)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote answered with a non-success status (502)
    #[error("Remote rejected request with status {status}: {body}")]
    RemoteRejected { status: u16, body: String },

    /// Follower store error (500)
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::Parse(_) => "parse",
            AppError::Config(_) => "config",
            AppError::KeyLoad(_) => "key_load",
            AppError::KeyParse(_) => "key_parse",
            AppError::Signing(_) => "signing",
            AppError::Serialization(_) => "serialization",
            AppError::Network(_) => "network",
            AppError::RemoteRejected { .. } => "remote_rejected",
            AppError::Store(_) => "store",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and a plain-text body.
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::Parse(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Network(_) | AppError::RemoteRejected { .. } => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::KeyLoad(_)
            | AppError::KeyParse(_)
            | AppError::Signing(_)
            | AppError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL
            .with_label_values(&[self.kind(), "unknown"])
            .inc();

        (status, message).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
