//! Error handling for the lifelog backend.
//!
//! Services return [`AppError`]; the transport layer alone decides how each
//! kind is shown to the user (status code plus error envelope).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::models::ValidationError;
use crate::store::StoreError;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const DUPLICATE_NAME: &str = "DUPLICATE_NAME";
    pub const IN_USE: &str = "IN_USE";
    pub const FUTURE_TIME: &str = "FUTURE_TIME";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// A field of the submitted entity is malformed
    Validation(String),
    /// Entity, tag or reference absent
    NotFound(String),
    /// Another tag already holds the requested name
    DuplicateName(String),
    /// Delete blocked by a live reference
    InUse(String),
    /// Listing query starts in the future
    FutureTime(String),
    /// Storage backend failure, passed through
    Database(String),
    /// Missing or invalid credentials
    Unauthorized(String),
    /// Malformed request outside entity validation
    BadRequest(String),
    /// Internal server error
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateName(_) => StatusCode::BAD_REQUEST,
            AppError::InUse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::FutureTime(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::DuplicateName(_) => codes::DUPLICATE_NAME,
            AppError::InUse(_) => codes::IN_USE,
            AppError::FutureTime(_) => codes::FUTURE_TIME,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        match self {
            AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::DuplicateName(msg)
            | AppError::InUse(msg)
            | AppError::FutureTime(msg)
            | AppError::Database(msg)
            | AppError::Unauthorized(msg)
            | AppError::BadRequest(msg)
            | AppError::Internal(msg) => msg,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => AppError::NotFound(err.to_string()),
            StoreError::OutOfRange(_) => AppError::Validation(err.to_string()),
            other => {
                tracing::error!("Storage error: {:?}", other);
                AppError::Database(format!("Storage error: {}", other))
            }
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message().to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorResponse::new(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Validation(String::new()), 400),
            (AppError::DuplicateName(String::new()), 400),
            (AppError::FutureTime(String::new()), 400),
            (AppError::NotFound(String::new()), 404),
            (AppError::InUse(String::new()), 422),
            (AppError::Database(String::new()), 500),
            (AppError::Unauthorized(String::new()), 401),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code().as_u16(), status, "{err}");
        }
    }

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let err: AppError = StoreError::NotFound {
            entity: "Tag",
            id: 7,
        }
        .into();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Tag 7 not found"));

        let err: AppError = StoreError::OutOfRange("duration".to_string()).into();
        assert!(matches!(err, AppError::Validation(_)));

        let err: AppError = StoreError::Poisoned.into();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn test_validation_error_message() {
        let err: AppError = ValidationError::Empty { field: "label" }.into();
        assert_eq!(err.to_string(), "VALIDATION_ERROR: label must not be empty");
    }
}
