use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::booking;
use crate::error::AppResult;
use crate::utils::jwt::Claims;
use crate::workflow::bookings::{self, BookingDecision};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub ride_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct BookingStatusRequest {
    pub status: BookingDecision,
}

/// Request a seat on a ride. The passenger is always the authenticated
/// caller, never taken from the payload.
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<Json<booking::Model>> {
    let created = bookings::request_booking(&*state.db, payload.ride_id, claims.sub).await?;
    tracing::info!(booking_id = %created.id, ride_id = %payload.ride_id, "booking requested");
    Ok(Json(created))
}

/// Confirm or cancel a pending booking on a ride the caller drives
pub async fn set_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<BookingStatusRequest>,
) -> AppResult<Json<booking::Model>> {
    let updated =
        bookings::set_booking_status(&*state.db, booking_id, payload.status, claims.sub).await?;
    tracing::info!(booking_id = %booking_id, status = ?payload.status, "booking status updated");
    Ok(Json(updated))
}
