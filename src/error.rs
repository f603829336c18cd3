// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Identity provider failures, mapped to something a person can read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthErrorKind {
    EmailInUse,
    InvalidEmail,
    WeakPassword,
    WrongPassword,
    UserNotFound,
    TooManyRequests,
    Other(String),
}

impl AuthErrorKind {
    /// Map an Identity Toolkit error code (e.g. `EMAIL_EXISTS`) to a kind.
    ///
    /// Codes may carry a suffix such as `WEAK_PASSWORD : Password should be ...`.
    pub fn from_provider_code(code: &str) -> Self {
        let head = code.split(':').next().unwrap_or(code).trim();
        match head {
            "EMAIL_EXISTS" => AuthErrorKind::EmailInUse,
            "INVALID_EMAIL" | "MISSING_EMAIL" => AuthErrorKind::InvalidEmail,
            "WEAK_PASSWORD" | "MISSING_PASSWORD" => AuthErrorKind::WeakPassword,
            "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => AuthErrorKind::WrongPassword,
            "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" | "USER_DISABLED" => AuthErrorKind::UserNotFound,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthErrorKind::TooManyRequests,
            other => AuthErrorKind::Other(other.to_string()),
        }
    }

    pub fn message(&self) -> String {
        match self {
            AuthErrorKind::EmailInUse => "This email is already registered".to_string(),
            AuthErrorKind::InvalidEmail => "Please enter a valid email address".to_string(),
            AuthErrorKind::WeakPassword => "Password must be at least 6 characters".to_string(),
            AuthErrorKind::WrongPassword => "Incorrect email or password".to_string(),
            AuthErrorKind::UserNotFound => "No account found for this email".to_string(),
            AuthErrorKind::TooManyRequests => {
                "Too many attempts. Please try again later".to_string()
            }
            AuthErrorKind::Other(code) => format!("Authentication failed ({})", code),
        }
    }
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{0}")]
    Auth(AuthErrorKind),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", Some(msg.clone()))
            }
            AppError::Auth(kind) => {
                let status = match kind {
                    AuthErrorKind::EmailInUse => StatusCode::CONFLICT,
                    AuthErrorKind::WrongPassword | AuthErrorKind::UserNotFound => {
                        StatusCode::UNAUTHORIZED
                    }
                    AuthErrorKind::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, "auth_error", Some(kind.message()))
            }
            AppError::Upstream(msg) => {
                tracing::warn!(error = %msg, "Upstream service error");
                (StatusCode::BAD_GATEWAY, "upstream_error", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers and services
pub type Result<T> = std::result::Result<T, AppError>;
