use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::entities::ride;
use crate::error::AppResult;
use crate::utils::jwt::Claims;
use crate::workflow::rides::{
    self, AvailableRide, NewRide, RideDecision, RideDetails, UserRide,
};
use crate::AppState;

#[derive(Debug, serde::Deserialize)]
pub struct RideStatusRequest {
    pub status: RideDecision,
}

/// List active rides open for booking. Works without authentication; an
/// authenticated caller's own rides are filtered out.
pub async fn list_available(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
) -> AppResult<Json<Vec<AvailableRide>>> {
    let viewer = claims.map(|Extension(c)| c.sub);
    let result = rides::list_available_rides(&*state.db, viewer).await?;
    Ok(Json(result))
}

/// Ride details with driver profile and passenger list
pub async fn get_ride(
    State(state): State<AppState>,
    Path(ride_id): Path<Uuid>,
) -> AppResult<Json<RideDetails>> {
    let details = rides::get_ride(&*state.db, ride_id).await?;
    Ok(Json(details))
}

/// Offer a new ride (driver/both role, enforced by the route guard)
pub async fn create_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<NewRide>,
) -> AppResult<Json<ride::Model>> {
    let created = rides::create_ride(&*state.db, claims.sub, payload).await?;
    tracing::info!(ride_id = %created.id, driver_id = %claims.sub, "ride created");
    Ok(Json(created))
}

/// Complete or cancel a ride the caller owns
pub async fn set_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ride_id): Path<Uuid>,
    Json(payload): Json<RideStatusRequest>,
) -> AppResult<Json<ride::Model>> {
    let updated = rides::set_ride_status(&*state.db, ride_id, payload.status, claims.sub).await?;
    tracing::info!(ride_id = %ride_id, status = ?payload.status, "ride status updated");
    Ok(Json(updated))
}

/// The caller's combined ride list: offers and bookings
pub async fn my_rides(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<UserRide>>> {
    let result = rides::list_rides_for_user(&*state.db, claims.sub).await?;
    Ok(Json(result))
}
