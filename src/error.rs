//! Error types for FactFeed
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::collections::BTreeMap;
use thiserror::Error;

/// Field-keyed validation messages, e.g. `{"content": ["Facts should be..."]}`.
///
/// BTreeMap keeps serialization order stable for clients and tests.
pub type ValidationErrors = BTreeMap<String, Vec<String>>;

/// Application-wide error type
///
/// This enum represents all possible errors that can occur
/// in the application. It implements `IntoResponse` to
/// automatically convert errors to appropriate HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// Authentication required (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Login credentials did not match (401)
    ///
    /// Same message whether the identifier or the password was wrong.
    #[error("Invalid username/email or password")]
    LoginFailed,

    /// Access denied (403)
    #[error("Access denied")]
    Forbidden,

    /// Single-message validation error (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Field-level validation errors (422)
    ///
    /// Carries the per-field message map returned to form clients.
    #[error("Validation failed")]
    Invalid(ValidationErrors),

    /// Vote mutation lost a unique-constraint race and exhausted
    /// its retries (409)
    #[error("Conflicting vote in progress, please retry")]
    VoteConflict,

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Signature verification failed (401)
    #[error("Invalid signature")]
    InvalidSignature,

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Encryption/signing error (500)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Build a field-level validation error for a single field.
    pub fn invalid_field(field: &str, message: &str) -> Self {
        let mut errors = ValidationErrors::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        AppError::Invalid(errors)
    }

    /// True when the underlying database error is a unique-constraint
    /// violation, which callers racing an insert may want to retry or
    /// remap.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            AppError::Database(db_error) => db_error
                .as_database_error()
                .is_some_and(|inner| inner.is_unique_violation()),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body. Mutation endpoints promise a
    /// `{success, data | errors}` envelope, so every error body
    /// carries `success: false`.
    fn into_response(self) -> Response {
        use axum::Json;

        // Field-level errors keep their structured map.
        if let AppError::Invalid(errors) = &self {
            use crate::metrics::ERRORS_TOTAL;
            ERRORS_TOTAL
                .with_label_values(&["invalid_fields", "unknown"])
                .inc();

            let body = Json(serde_json::json!({
                "success": false,
                "errors": errors,
            }));
            return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
        }

        let (status, error_message, error_type) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string(), "not_found"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string(), "unauthorized"),
            AppError::LoginFailed => (StatusCode::UNAUTHORIZED, self.to_string(), "login_failed"),
            AppError::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                self.to_string(),
                "invalid_signature",
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string(), "forbidden"),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "validation"),
            AppError::Invalid(_) => unreachable!("handled above"),
            AppError::VoteConflict => (StatusCode::CONFLICT, self.to_string(), "vote_conflict"),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error, please try again".to_string(),
                "database",
            ),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "config"),
            AppError::Encryption(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "encryption")
            }
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "internal",
            ),
        };

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL
            .with_label_values(&[error_type, "unknown"])
            .inc();

        let body = Json(serde_json::json!({
            "success": false,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
