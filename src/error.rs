//! Error types for the events server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Machine-checkable reason attached to every domain error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 2,
    BadValue = 3,
    UserNotFound = 10,
    CategoryNotFound = 11,
    EventNotFound = 12,
    EventDateTooSoon = 20,
    InvalidDateRange = 21,
    InvalidPage = 22,
    InvalidStateAction = 30,
    StateConflict = 31,
    PublishedEventImmutable = 32,
    ConcurrentModification = 33,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {1}")]
    NotFound(ErrorCode, String),

    #[error("Validation error: {1}")]
    Validation(ErrorCode, String),

    #[error("Conflict: {1}")]
    Conflict(ErrorCode, String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn event_not_found(id: i64) -> Self {
        AppError::NotFound(
            ErrorCode::EventNotFound,
            format!("Event with id={} was not found", id),
        )
    }

    pub fn user_not_found(id: i64) -> Self {
        AppError::NotFound(
            ErrorCode::UserNotFound,
            format!("User with id={} was not found", id),
        )
    }

    pub fn category_not_found(id: i64) -> Self {
        AppError::NotFound(
            ErrorCode::CategoryNotFound,
            format!("Category with id={} was not found", id),
        )
    }

    pub fn bad_value(msg: impl Into<String>) -> Self {
        AppError::Validation(ErrorCode::BadValue, msg.into())
    }

    /// Reason code, when the error carries one
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::NotFound(code, _)
            | AppError::Validation(code, _)
            | AppError::Conflict(code, _) => *code,
            AppError::Database(_) => ErrorCode::DbFailure,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::bad_value(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::NotFound(_, msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(_, msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(_, msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        let response = AppError::event_not_found(7).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_keeps_reason_code() {
        let err = AppError::Conflict(ErrorCode::StateConflict, "nope".into());
        assert_eq!(err.code(), ErrorCode::StateConflict);
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_validation_is_bad_request() {
        let response = AppError::bad_value("bad").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
