//! JWT Token Handler
//! Mission: Issue access/refresh token pairs and validate them statelessly

use crate::auth::errors::AuthError;
use crate::auth::models::{Claims, RefreshClaims, TokenPair, User};
use crate::auth::token::{self, HmacSha256Signer, TokenSigner};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

pub const ACCESS_TOKEN_TTL_HOURS: i64 = 24;
pub const REFRESH_TOKEN_TTL_HOURS: i64 = 168;

/// JWT Handler for token operations
pub struct JwtHandler {
    signer: Box<dyn TokenSigner>,
    access_ttl_hours: i64,
    refresh_ttl_hours: i64,
}

impl JwtHandler {
    /// Create a new JWT handler with an HS256 secret key
    pub fn new(secret: String) -> Self {
        Self::with_signer(Box::new(HmacSha256Signer::new(secret)))
    }

    pub(crate) fn with_signer(signer: Box<dyn TokenSigner>) -> Self {
        Self {
            signer,
            access_ttl_hours: ACCESS_TOKEN_TTL_HOURS,
            refresh_ttl_hours: REFRESH_TOKEN_TTL_HOURS,
        }
    }

    pub fn with_ttl_hours(mut self, access: i64, refresh: i64) -> Self {
        self.access_ttl_hours = access;
        self.refresh_ttl_hours = refresh;
        self
    }

    /// Generate a fresh access + refresh token pair for a user
    pub fn issue(&self, user: &User) -> Result<TokenPair, AuthError> {
        self.issue_at(user, Utc::now())
    }

    fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        let access_exp = expiry(now, self.access_ttl_hours)?;
        let refresh_exp = expiry(now, self.refresh_ttl_hours)?;

        let claims = Claims {
            uid: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            user_type: user.user_type,
            exp: access_exp,
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let refresh_claims = RefreshClaims {
            uid: user.id.clone(),
            exp: refresh_exp,
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        debug!(
            user_id = %user.id,
            role = user.user_type.as_str(),
            "Generating token pair, access expires in {}h",
            self.access_ttl_hours
        );

        Ok(TokenPair {
            token: token::seal(self.signer.as_ref(), &claims)?,
            refresh_token: token::seal(self.signer.as_ref(), &refresh_claims)?,
        })
    }

    /// Validate an access token and extract claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims: Claims = token::open(self.signer.as_ref(), token)?;
        check_expiry(claims.exp, Utc::now().timestamp())?;

        debug!(user_id = %claims.uid, "Validated access token");
        Ok(claims)
    }
}

fn expiry(now: DateTime<Utc>, hours: i64) -> Result<i64, AuthError> {
    now.checked_add_signed(Duration::hours(hours))
        .map(|t| t.timestamp())
        .ok_or_else(|| AuthError::Signing("invalid expiry timestamp".into()))
}

fn check_expiry(exp: i64, now: i64) -> Result<(), AuthError> {
    if exp < now {
        return Err(AuthError::Expired);
    }
    Ok(())
}
