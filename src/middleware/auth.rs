use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::error::{AppError, AppResult};
use crate::utils::jwt::{verify_token, Claims};
use crate::AppState;

/// Extract and validate JWT token from Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let claims = verify_token(auth.token(), &state.config.jwt_secret)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Like `auth_middleware`, but tolerates missing or invalid tokens.
/// Used on public routes whose responses are personalized when a valid
/// token happens to be present.
pub async fn auth_optional(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(TypedHeader(auth)) = auth {
        if let Ok(claims) = verify_token(auth.token(), &state.config.jwt_secret) {
            request.extensions_mut().insert(claims);
        }
    }
    next.run(request).await
}

/// Require a role that can offer rides (`driver` or `both`)
pub async fn require_driver(
    request: Request,
    next: Next,
) -> AppResult<Response> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::Unauthorized("No authentication found".to_string()))?;

    if !claims.role.can_drive() {
        return Err(AppError::Forbidden("Driver access required".to_string()));
    }

    Ok(next.run(request).await)
}
