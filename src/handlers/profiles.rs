use axum::{
    extract::{Path, State},
    Extension, Json,
};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::profile::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub university: Option<String>,
    pub role: Option<UserRole>,
}

/// The caller's own profile
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<profile::Model>> {
    let profile = profile::Entity::find_by_id(claims.sub)
        .one(&*state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(profile))
}

/// Update the caller's own profile. Email and password changes go
/// through dedicated flows, not here.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<profile::Model>> {
    let profile = profile::Entity::find_by_id(claims.sub)
        .one(&*state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    let mut active: profile::ActiveModel = profile.into();

    if let Some(full_name) = payload.full_name {
        if full_name.trim().is_empty() {
            return Err(AppError::BadRequest("Name cannot be empty".to_string()));
        }
        active.full_name = Set(full_name);
    }

    if let Some(phone_number) = payload.phone_number {
        active.phone_number = Set(Some(phone_number));
    }

    if let Some(university) = payload.university {
        active.university = Set(Some(university));
    }

    if let Some(role) = payload.role {
        active.role = Set(role);
    }

    let updated = active.update(&*state.db).await?;
    Ok(Json(updated))
}

/// Another user's public profile
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<profile::Model>> {
    let profile = profile::Entity::find_by_id(user_id)
        .one(&*state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(profile))
}
