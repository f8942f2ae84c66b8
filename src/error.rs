use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, TransactionError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Failure taxonomy for the booking workflow and its HTTP surface.
///
/// Validation failures are raised before any mutation; `RemoteStore` is the
/// only variant that can surface mid-operation, and compound operations run
/// inside a transaction so it never leaves partial state.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("You already have an active booking for this ride")]
    AlreadyBooked,

    #[error("You cannot book your own ride")]
    SelfBookingForbidden,

    #[error("No seats available for this ride")]
    NoSeatsAvailable,

    #[error("{0}")]
    InvalidTransition(String),

    #[error("database error: {0}")]
    RemoteStore(#[from] DbErr),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) | AppError::SelfBookingForbidden => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_)
            | AppError::AlreadyBooked
            | AppError::NoSeatsAvailable
            | AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::RemoteStore(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Never leak store internals to clients
        let message = match &self {
            AppError::RemoteStore(err) => {
                tracing::error!(error = %err, "database operation failed");
                "A database error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<TransactionError<AppError>> for AppError {
    fn from(err: TransactionError<AppError>) -> Self {
        match err {
            TransactionError::Connection(db) => AppError::RemoteStore(db),
            TransactionError::Transaction(app) => app,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_failures_map_to_conflict() {
        assert_eq!(AppError::AlreadyBooked.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::NoSeatsAvailable.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InvalidTransition("ride is already completed".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn ownership_failures_map_to_forbidden() {
        assert_eq!(
            AppError::Forbidden("not your ride".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::SelfBookingForbidden.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn store_failures_map_to_internal() {
        let err = AppError::RemoteStore(DbErr::Custom("boom".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn transaction_errors_unwrap_to_inner_kind() {
        let wrapped = TransactionError::Transaction(AppError::NoSeatsAvailable);
        assert!(matches!(AppError::from(wrapped), AppError::NoSeatsAvailable));
    }
}
