use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use marquee_core::{BookingError, HoldError};

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    UnavailableError(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::UnavailableError(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<HoldError> for AppError {
    fn from(err: HoldError) -> Self {
        match &err {
            HoldError::SeatNotFound(_) => AppError::NotFoundError(err.to_string()),
            HoldError::AlreadyLocked(_) | HoldError::AlreadyBooked(_) => {
                AppError::ConflictError(err.to_string())
            }
            HoldError::NotOwner(_) => AppError::AuthorizationError(err.to_string()),
            HoldError::Store(_) => AppError::InternalServerError(err.to_string()),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match &err {
            BookingError::EmptyRequest | BookingError::SeatNotInShow { .. } => {
                AppError::ValidationError(err.to_string())
            }
            BookingError::LockNotHeld(_) => AppError::ConflictError(err.to_string()),
            BookingError::QueueClosed => AppError::UnavailableError(err.to_string()),
            BookingError::Store(_) => AppError::InternalServerError(err.to_string()),
        }
    }
}
