use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Extension, Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;
use marquee_core::JobStatus;

#[derive(Debug, Deserialize)]
struct ConfirmBookingRequest {
    show_id: Uuid,
    seat_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
struct BookingResponse {
    job_id: Uuid,
    status: String,
}

#[derive(Debug, Serialize)]
struct BookingStatusResponse {
    job_id: Uuid,
    status: JobStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(confirm_booking))
        .route("/v1/bookings/stream", get(stream_events))
        .route("/v1/bookings/{job_id}", get(booking_status))
}

/// Fire-and-forget submission: the caller only learns "queued" here and
/// observes the outcome via status polling or the event stream.
async fn confirm_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ConfirmBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let job_id = state
        .bookings
        .enqueue(&claims.sub, req.seat_ids, req.show_id)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(BookingResponse {
            job_id,
            status: "QUEUED".to_string(),
        }),
    ))
}

async fn booking_status(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<BookingStatusResponse>, AppError> {
    let status = state
        .bookings
        .job_status(job_id)
        .await
        .ok_or_else(|| AppError::NotFoundError(format!("Unknown booking job: {}", job_id)))?;
    Ok(Json(BookingStatusResponse { job_id, status }))
}

async fn stream_events(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.bookings.subscribe();

    let stream = tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => {
                let data = serde_json::to_string(&event).ok()?;
                Some(Ok::<Event, Infallible>(
                    Event::default().event("booking").data(data),
                ))
            }
            // A lagged subscriber just skips ahead.
            Err(_) => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
