// Authentication and authorization error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::auth::models::Role;
use crate::error::ErrorResponse;

/// Authentication and authorization error types
///
/// Every token, cookie and lookup failure that means "we don't know who you
/// are" collapses into the same 401 body. The variants stay distinct so they
/// can be logged.
#[derive(Debug, Error)]
pub enum AuthError {
    // Request errors
    #[error("Validation error: {0}")]
    ValidationError(String),

    // Credential errors
    #[error("Identifier is already registered")]
    DuplicateIdentifier,
    #[error("Invalid email or password")]
    InvalidCredentials,

    // Token and session errors
    #[error("Token signature is invalid")]
    InvalidSignature,
    #[error("Token has expired")]
    Expired,
    #[error("Token is malformed")]
    Malformed,
    #[error("Session cookie signature is invalid")]
    TamperedCookie,
    #[error("Authentication required")]
    Unauthenticated,

    // Authorization errors
    /// Identity is known but the action is not allowed for its role
    #[error("Insufficient permissions: required role '{required}', but user has role '{actual}'")]
    Forbidden { required: Role, actual: Role },

    // Internal errors
    #[error("User store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Password hashing error: {0}")]
    PasswordHashError(String),
    #[error("Token generation error: {0}")]
    TokenGenerationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AuthError::DuplicateIdentifier => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::InvalidSignature
            | AuthError::Expired
            | AuthError::Malformed
            | AuthError::TamperedCookie
            | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AuthError::StoreUnavailable(_)
            | AuthError::PasswordHashError(_)
            | AuthError::TokenGenerationError(_)
            | AuthError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code sent to clients
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::ValidationError(_) => "VALIDATION_ERROR",
            AuthError::DuplicateIdentifier => "DUPLICATE_IDENTIFIER",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::InvalidSignature
            | AuthError::Expired
            | AuthError::Malformed
            | AuthError::TamperedCookie
            | AuthError::Unauthenticated => "UNAUTHENTICATED",
            AuthError::Forbidden { .. } => "FORBIDDEN",
            AuthError::StoreUnavailable(_)
            | AuthError::PasswordHashError(_)
            | AuthError::TokenGenerationError(_)
            | AuthError::ConfigError(_) => "INTERNAL_ERROR",
        }
    }

    /// Get a descriptive error message for this error
    /// This message is safe to send to clients (no sensitive data)
    pub fn error_message(&self) -> String {
        match self {
            AuthError::ValidationError(msg) => msg.clone(),
            AuthError::DuplicateIdentifier => "Email already exists".to_string(),
            AuthError::InvalidCredentials => "Invalid email or password".to_string(),
            AuthError::InvalidSignature
            | AuthError::Expired
            | AuthError::Malformed
            | AuthError::TamperedCookie
            | AuthError::Unauthenticated => "Authentication required".to_string(),
            AuthError::Forbidden { required, .. } => {
                format!("Insufficient permissions: required role '{}'", required)
            }
            AuthError::StoreUnavailable(_)
            | AuthError::PasswordHashError(_)
            | AuthError::TokenGenerationError(_)
            | AuthError::ConfigError(_) => "Internal server error".to_string(),
        }
    }

    pub(crate) fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        match self {
            AuthError::ValidationError(msg) => debug!("Auth validation error: {}", msg),
            AuthError::DuplicateIdentifier => warn!("Sign-up attempted with an existing identifier"),
            AuthError::InvalidCredentials => warn!("Invalid credentials presented"),
            AuthError::Forbidden { required, actual } => warn!(
                "Authorization failed: required role '{}', user has role '{}'",
                required, actual
            ),
            AuthError::StoreUnavailable(msg) => error!("User store error: {}", msg),
            AuthError::PasswordHashError(msg) => error!("Password hashing error: {}", msg),
            AuthError::TokenGenerationError(msg) => error!("Token generation error: {}", msg),
            AuthError::ConfigError(msg) => error!("Authorization configuration error: {}", msg),
            // The specific kind was already logged where it was detected
            other => debug!("Unauthenticated request: {}", other),
        }

        (
            self.status_code(),
            ErrorResponse {
                error_code: self.error_code().to_string(),
                message: self.error_message(),
                details: None,
                timestamp: Utc::now().to_rfc3339(),
            },
        )
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, body) = self.to_error_response();
        (status, Json(body)).into_response()
    }
}
