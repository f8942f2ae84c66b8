use axum::{extract::Query, Json};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::utils::fare::estimate_fare;

#[derive(Debug, Deserialize)]
pub struct FareQuery {
    pub distance_km: f64,
    pub duration_min: f64,
    #[serde(default = "default_passengers")]
    pub passengers: u32,
}

fn default_passengers() -> u32 {
    1
}

#[derive(Debug, Serialize)]
pub struct FareResponse {
    pub fare: i64,
}

/// Estimate a fare for a route. Pure arithmetic, no store access.
pub async fn estimate(Query(query): Query<FareQuery>) -> AppResult<Json<FareResponse>> {
    if query.distance_km < 0.0 || query.duration_min < 0.0 {
        return Err(AppError::BadRequest(
            "Distance and duration must be non-negative".to_string(),
        ));
    }

    Ok(Json(FareResponse {
        fare: estimate_fare(query.distance_km, query.duration_min, query.passengers),
    }))
}
