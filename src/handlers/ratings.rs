use axum::{
    extract::{Path, State},
    Extension, Json,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::{profile, rating};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RateUserRequest {
    pub ride_id: Uuid,
    pub rated_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

/// Mean of rating values, rounded to 2 decimals. None for an empty set.
fn average(values: &[i32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: i32 = values.iter().sum();
    let mean = f64::from(sum) / values.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}

/// Rate another user for a shared ride. The rater is the authenticated
/// caller. Recomputes the ratee's aggregate rating.
pub async fn rate_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<RateUserRequest>,
) -> AppResult<Json<rating::Model>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest(
            "Rating must be between 1 and 5".to_string(),
        ));
    }

    if payload.rated_id == claims.sub {
        return Err(AppError::BadRequest("You cannot rate yourself".to_string()));
    }

    let new_rating = rating::ActiveModel {
        id: Set(Uuid::new_v4()),
        ride_id: Set(payload.ride_id),
        rater_id: Set(claims.sub),
        rated_id: Set(payload.rated_id),
        rating: Set(payload.rating),
        comment: Set(payload.comment),
        ..Default::default()
    };

    // The unique index on (ride, rater, rated) rejects double-rating
    let created = new_rating.insert(&*state.db).await.map_err(|err| {
        if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
            AppError::Conflict("You have already rated this user for this ride".to_string())
        } else {
            AppError::RemoteStore(err)
        }
    })?;

    recompute_average(&state, payload.rated_id).await?;

    Ok(Json(created))
}

/// Ratings received by a user, newest first
pub async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<rating::Model>>> {
    let ratings = rating::Entity::find()
        .filter(rating::Column::RatedId.eq(user_id))
        .order_by_desc(rating::Column::CreatedAt)
        .all(&*state.db)
        .await?;

    Ok(Json(ratings))
}

async fn recompute_average(state: &AppState, user_id: Uuid) -> AppResult<()> {
    let values: Vec<i32> = rating::Entity::find()
        .filter(rating::Column::RatedId.eq(user_id))
        .all(&*state.db)
        .await?
        .into_iter()
        .map(|r| r.rating)
        .collect();

    let profile = profile::Entity::find_by_id(user_id)
        .one(&*state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let mut active: profile::ActiveModel = profile.into();
    active.rating = Set(average(&values));
    active.update(&*state.db).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_has_no_average() {
        assert_eq!(average(&[]), None);
    }

    #[test]
    fn average_rounds_to_two_decimals() {
        assert_eq!(average(&[5, 4, 4]), Some(4.33));
        assert_eq!(average(&[3]), Some(3.0));
        assert_eq!(average(&[1, 2]), Some(1.5));
    }
}
