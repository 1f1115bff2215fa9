// Route modules
pub mod credits;
pub mod health;
pub mod sessions;
pub mod webhooks;

use crate::{
    app_state::AppState,
    middleware::{create_rate_limiter, jwt_auth_middleware, logging_middleware},
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer};

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes(state.clone()))
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}

/// API v1 routes
fn api_v1_routes(state: AppState) -> Router<AppState> {
    // Session starts spin up upstream conversational sessions, so they get
    // both authentication and rate limiting
    let rate_limiter = create_rate_limiter(state.redis.clone());
    let gated_routes = Router::new()
        .route("/sessions/start", post(sessions::start_session))
        .route_layer(middleware::from_fn(rate_limiter))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ));

    // Auth-only routes (no rate limiting, require JWT)
    let auth_only_routes = Router::new()
        .route("/credits", get(credits::get_credits))
        .route("/credits/transactions", get(credits::list_transactions))
        .route("/sessions/finish", post(sessions::finish_session))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ));

    // Public routes: Stripe authenticates with its signature header, the
    // health probe with nothing at all
    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/webhooks/stripe", post(webhooks::stripe_webhook));

    // Combine all routes with request/response body logging
    Router::new()
        .merge(gated_routes)
        .merge(auth_only_routes)
        .merge(public_routes)
        .layer(middleware::from_fn(logging_middleware))
}
