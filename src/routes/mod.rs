use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handlers::{auth, bookings, fare, messages, notifications, profiles, ratings, rides};
use crate::middleware::auth::{auth_middleware, auth_optional, require_driver};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::role_rate_limit::{create_role_governor, RateLimitedRole};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Role-specific governor layers, keyed by authenticated user id
    let driver_governor = create_role_governor(RateLimitedRole::Driver);
    let rider_governor = create_role_governor(RateLimitedRole::Rider);
    // IP-based governor for unauthenticated routes
    let public_governor = create_public_governor();

    // Public auth routes
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(public_governor.clone());

    // Public browse routes. A valid token personalizes the ride list
    // (own offers filtered out) but is never required.
    let public_routes = Router::new()
        .route("/rides", get(rides::list_available))
        .route("/rides/{id}", get(rides::get_ride))
        .route("/users/{id}/ratings", get(ratings::list_for_user))
        .route("/fare/estimate", get(fare::estimate))
        .layer(middleware::from_fn_with_state(state.clone(), auth_optional))
        .layer(public_governor);

    // Driver routes (requires auth + driver/both role)
    // Rate limit: 500 requests per minute (5x base)
    let driver_routes = Router::new()
        .route("/rides", post(rides::create_ride))
        .route("/rides/{id}/status", put(rides::set_status))
        .route("/bookings/{id}/status", put(bookings::set_status))
        .layer(driver_governor)
        .layer(middleware::from_fn(require_driver))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Authenticated routes for any role
    // Rate limit: 100 requests per minute (base)
    let user_routes = Router::new()
        .route("/bookings", post(bookings::create_booking))
        .route("/my-rides", get(rides::my_rides))
        .route("/messages", get(messages::list_conversations))
        .route("/messages", post(messages::send_message))
        .route("/messages/{user_id}", get(messages::conversation_with))
        .route("/notifications", get(notifications::list))
        .route("/notifications/read-all", put(notifications::mark_all_read))
        .route("/notifications/{id}/read", put(notifications::mark_read))
        .route("/ratings", post(ratings::rate_user))
        .route("/profile", get(profiles::me))
        .route("/profile", put(profiles::update_me))
        .route("/users/{id}", get(profiles::get_user))
        .layer(rider_governor)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", public_routes)
        .nest("/api/driver", driver_routes)
        .nest("/api", user_routes)
        .with_state(state)
}
