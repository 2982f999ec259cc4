use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;
use marquee_core::Seat;

#[derive(Debug, Serialize)]
struct SeatsResponse {
    seats: Vec<Seat>,
}

#[derive(Debug, Deserialize)]
struct SeatLockRequest {
    seat_id: Uuid,
}

#[derive(Debug, Serialize)]
struct SeatLockResponse {
    status: String,
    expires_at: Option<DateTime<Utc>>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/shows/{show_id}/seats", get(list_seats))
        .route("/v1/seats/lock", post(lock_seat))
        .route("/v1/seats/unlock", post(unlock_seat))
}

async fn list_seats(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(show_id): Path<Uuid>,
) -> Result<Json<SeatsResponse>, AppError> {
    let seats = state
        .seats
        .find_by_show(show_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    Ok(Json(SeatsResponse { seats }))
}

async fn lock_seat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SeatLockRequest>,
) -> Result<Json<SeatLockResponse>, AppError> {
    let lock = state.reservations.acquire(req.seat_id, &claims.sub).await?;
    Ok(Json(SeatLockResponse {
        status: "LOCKED".to_string(),
        expires_at: Some(lock.expires_at),
    }))
}

async fn unlock_seat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SeatLockRequest>,
) -> Result<Json<SeatLockResponse>, AppError> {
    state.reservations.release(req.seat_id, &claims.sub).await?;
    Ok(Json(SeatLockResponse {
        status: "UNLOCKED".to_string(),
        expires_at: None,
    }))
}
