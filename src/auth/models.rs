//! Authentication Models
//! Mission: Define user records, token claims, and request payloads

use crate::auth::errors::AuthError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Persisted user account
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub user_type: UserRole,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User roles for RBAC
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserRole {
    #[serde(rename = "USER")]
    User, // Own record only
    #[serde(rename = "ADMIN")]
    Admin, // Every record, plus listing
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "USER",
            UserRole::Admin => "ADMIN",
        }
    }
}

impl FromStr for UserRole {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USER" => Ok(UserRole::User),
            "ADMIN" => Ok(UserRole::Admin),
            other => Err(AuthError::Validation(format!(
                "user_type must be USER or ADMIN, got {other:?}"
            ))),
        }
    }
}

/// Access token payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub uid: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserRole,
    pub exp: i64, // expiration, unix seconds
    pub iat: i64,
    pub jti: String,
}

/// Refresh token payload; carries identity but nothing used for authorization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RefreshClaims {
    pub uid: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

/// Freshly signed access + refresh tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

/// Signup request body. Every field is optional at the wire level so a
/// missing field surfaces as a validation error naming it.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub user_type: Option<String>,
}

/// Signup fields after presence checks
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub password: String,
    pub user_type: UserRole,
}

fn required(field: &'static str, value: Option<String>) -> Result<String, AuthError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(AuthError::Validation(format!("{field} is required"))),
    }
}

impl SignupRequest {
    pub fn validate(self) -> Result<NewUser, AuthError> {
        let user_type = match self.user_type.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => UserRole::User,
        };

        // Passwords are taken verbatim; whitespace is significant
        let password = match self.password {
            Some(p) if !p.is_empty() => p,
            _ => return Err(AuthError::Validation("password is required".into())),
        };

        Ok(NewUser {
            email: required("email", self.email)?,
            first_name: required("first_name", self.first_name)?,
            last_name: required("last_name", self.last_name)?,
            phone: required("phone", self.phone)?,
            password,
            user_type,
        })
    }
}

/// Login request body
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn validate(self) -> Result<(String, String), AuthError> {
        let email = required("email", self.email)?;
        let password = match self.password {
            Some(p) if !p.is_empty() => p,
            _ => return Err(AuthError::Validation("password is required".into())),
        };
        Ok((email, password))
    }
}

pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// `GET /users` query string; kept as raw strings so junk falls back to defaults
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub page: Option<String>,
}

impl PageQuery {
    /// Returns `(limit, page)`, each at least 1
    pub fn resolve(&self) -> (u32, u32) {
        let parse = |v: &Option<String>, default: u32| {
            v.as_deref()
                .and_then(|s| s.trim().parse::<u32>().ok())
                .filter(|&n| n >= 1)
                .unwrap_or(default)
        };
        (
            parse(&self.limit, DEFAULT_PAGE_LIMIT),
            parse(&self.page, 1),
        )
    }

    pub fn offset(&self) -> u64 {
        let (limit, page) = self.resolve();
        (page as u64 - 1) * limit as u64
    }
}

/// One page of users plus the collection size
#[derive(Debug, Serialize)]
pub struct UserPage {
    pub total_count: u64,
    pub user_items: Vec<User>,
}
