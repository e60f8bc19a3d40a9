// Error handling types for the API

use async_graphql::ErrorExtensions;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;
use tracing::error;

use super::validation::ValidationResult;

/// Message returned for every failed login, whatever the cause.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "invalid email or password";

/// API error types
#[derive(Debug)]
pub enum ApiError {
    Conflict(String),
    InvalidCredentials,
    NotAuthenticated(String),
    UserNotFound,
    CsrfMismatch(String),
    ExchangeError(String),
    ProviderError(String),
    ValidationError(String),
    BadRequest(String),
    NotFound(String),
    InternalServer(String),
    DatabaseError(sqlx::Error),
}

impl ApiError {
    /// Maps a failed `INSERT` into the authoritative `Conflict` when the
    /// store rejected it on a uniqueness constraint.
    pub fn from_insert(e: sqlx::Error, conflict_message: &str) -> Self {
        match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ApiError::Conflict(conflict_message.to_string())
            }
            _ => ApiError::DatabaseError(e),
        }
    }

    fn parts(&self) -> (StatusCode, String, &'static str) {
        match self {
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone(), "CONFLICT"),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                INVALID_CREDENTIALS_MESSAGE.to_string(),
                "INVALID_CREDENTIALS",
            ),
            ApiError::NotAuthenticated(msg) => {
                (StatusCode::UNAUTHORIZED, msg.clone(), "NOT_AUTHENTICATED")
            }
            ApiError::UserNotFound => (
                StatusCode::NOT_FOUND,
                "user not found".to_string(),
                "USER_NOT_FOUND",
            ),
            ApiError::CsrfMismatch(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "CSRF_MISMATCH"),
            ApiError::ExchangeError(msg) => {
                (StatusCode::BAD_GATEWAY, msg.clone(), "EXCHANGE_ERROR")
            }
            ApiError::ProviderError(msg) => {
                (StatusCode::BAD_GATEWAY, msg.clone(), "PROVIDER_ERROR")
            }
            ApiError::ValidationError(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone(), "VALIDATION_ERROR")
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "BAD_REQUEST"),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), "NOT_FOUND"),
            ApiError::InternalServer(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg.clone(),
                "INTERNAL_SERVER_ERROR",
            ),
            ApiError::DatabaseError(e) => {
                error!(error = %e, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database operation failed".to_string(),
                    "DATABASE_ERROR",
                )
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InvalidCredentials => {
                write!(f, "Invalid Credentials: {}", INVALID_CREDENTIALS_MESSAGE)
            }
            ApiError::NotAuthenticated(msg) => write!(f, "Not Authenticated: {}", msg),
            ApiError::UserNotFound => write!(f, "User Not Found"),
            ApiError::CsrfMismatch(msg) => write!(f, "CSRF Mismatch: {}", msg),
            ApiError::ExchangeError(msg) => write!(f, "Exchange Error: {}", msg),
            ApiError::ProviderError(msg) => write!(f, "Provider Error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::DatabaseError(e) => write!(f, "Database Error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message, code) = self.parts();

        let error_response = ErrorResponse {
            error: error_message,
            code: code.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

/// GraphQL errors carry the same message as the HTTP body and the code
/// under `extensions.code`.
impl ErrorExtensions for ApiError {
    fn extend(&self) -> async_graphql::Error {
        let (_, message, code) = self.parts();
        async_graphql::Error::new(message).extend_with(|_, e| e.set("code", code))
    }
}

/// Helper function to convert ValidationResult to ApiError
impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        if result.is_valid {
            ApiError::InternalServer(
                "Validation result was valid but converted to error".to_string(),
            )
        } else {
            let error_messages: Vec<String> = result
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            ApiError::ValidationError(error_messages.join(", "))
        }
    }
}
