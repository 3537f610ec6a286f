//! Authentication Errors
//! Mission: One failure taxonomy for tokens, credentials, and storage

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use std::time::Duration;
use tracing::error;

/// Principal attribute that must be unique across all users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictField {
    Email,
    Phone,
}

impl fmt::Display for ConflictField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictField::Email => write!(f, "email"),
            ConflictField::Phone => write!(f, "phone"),
        }
    }
}

/// Every failure the auth core can report to the HTTP boundary
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no token found")]
    MissingToken,
    #[error("the token is malformed")]
    Malformed,
    #[error("the token signature is invalid")]
    BadSignature,
    #[error("token is expired")]
    Expired,
    #[error("unauthorized to access user data")]
    Unauthorized,
    #[error("user with this {} already exists", join_fields(.0))]
    Conflict(Vec<ConflictField>),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("user not found")]
    NotFound,
    #[error("storage operation exceeded {0:?}")]
    Timeout(Duration),
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("{0}")]
    Validation(String),
    #[error("storage failure: {0}")]
    Storage(#[source] anyhow::Error),
    #[error("internal failure: {0}")]
    Internal(#[source] anyhow::Error),
}

fn join_fields(fields: &[ConflictField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" and ")
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingToken
            | AuthError::Malformed
            | AuthError::BadSignature
            | AuthError::Expired
            | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Unauthorized => StatusCode::FORBIDDEN,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Signing(_) | AuthError::Storage(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details stay in the logs
        let message = match &self {
            AuthError::Storage(e) => {
                error!(error = ?e, "storage failure");
                "internal server error".to_string()
            }
            AuthError::Internal(e) => {
                error!(error = ?e, "internal failure");
                "internal server error".to_string()
            }
            AuthError::Signing(e) => {
                error!(error = %e, "token signing failure");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
