//! Authentication API Endpoints
//! Mission: Provide signup, login, and gated user endpoints

use crate::auth::{
    errors::AuthError,
    models::{Claims, LoginRequest, PageQuery, SignupRequest, User, UserPage},
    service::AuthService,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Extension, Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub service: Arc<AuthService>,
}

impl AuthState {
    pub fn new(service: Arc<AuthService>) -> Self {
        Self { service }
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AuthError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| AuthError::Validation(rejection.body_text()))
}

/// Signup endpoint - POST /users/signup
pub async fn signup(
    State(state): State<AuthState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<User>, AuthError> {
    let req = body(payload)?;
    info!("🆕 Signup attempt: {}", req.email.as_deref().unwrap_or("<missing>"));

    let user = state.service.signup(req).await?;
    Ok(Json(user))
}

/// Login endpoint - POST /users/login
pub async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<User>, AuthError> {
    let req = body(payload)?;
    info!("🔐 Login attempt: {}", req.email.as_deref().unwrap_or("<missing>"));

    let user = state.service.login(req).await?;
    Ok(Json(user))
}

/// List users - GET /users?limit=&page= (Admin only)
pub async fn list_users(
    State(state): State<AuthState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
) -> Result<Json<UserPage>, AuthError> {
    let page = state.service.list_users(&claims, &query).await?;
    Ok(Json(page))
}

/// Get one user - GET /users/:id (self or Admin)
pub async fn get_user(
    State(state): State<AuthState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, AuthError> {
    let user = state.service.get_user(&claims, &user_id).await?;
    Ok(Json(user))
}

/// Health check - GET /health
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
