//! HTTP Router
//! Mission: Wire auth endpoints, token middleware, and request logging

use crate::auth::{api as auth_api, auth_middleware, AuthService, AuthState};
use crate::middleware::request_logging;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub fn build_router(service: Arc<AuthService>) -> Router {
    let auth_state = AuthState::new(service);

    // Public routes: credentials in the body, no token yet
    let auth_router = Router::new()
        .route("/users/signup", post(auth_api::signup))
        .route("/users/login", post(auth_api::login))
        .route("/health", get(auth_api::health_check))
        .with_state(auth_state.clone());

    // Protected routes: `token` header required
    let protected_routes = Router::new()
        .route("/users", get(auth_api::list_users))
        .route("/users/:id", get(auth_api::get_user))
        .route_layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(auth_state);

    Router::new()
        .merge(auth_router)
        .merge(protected_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}
