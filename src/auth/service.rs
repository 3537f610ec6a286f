//! Auth Service
//! Mission: Signup, login, and gated user reads over injected collaborators

use crate::auth::errors::{AuthError, ConflictField};
use crate::auth::gate::{authorize_claims, Access};
use crate::auth::jwt::JwtHandler;
use crate::auth::models::{
    Claims, LoginRequest, PageQuery, SignupRequest, TokenPair, User, UserPage, UserRole,
};
use crate::auth::password::CredentialHasher;
use crate::auth::user_store::{UserFilter, UserPatch, UserRepository};
use anyhow::Context;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(100);

/// Bound a storage call by `limit`; the call is dropped, not retried, on expiry
pub async fn with_deadline<T, F>(limit: Duration, op: F) -> Result<T, AuthError>
where
    F: Future<Output = Result<T, AuthError>>,
{
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_ms = limit.as_millis() as u64, "Storage deadline exceeded");
            Err(AuthError::Timeout(limit))
        }
    }
}

/// Admin account created at startup when configured
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub phone: String,
}

pub struct AuthService {
    store: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
    jwt: Arc<JwtHandler>,
    store_timeout: Duration,
    /// Verified against on unknown emails, hashed at the hasher's own cost
    decoy_hash: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserRepository>,
        hasher: Arc<dyn CredentialHasher>,
        jwt: Arc<JwtHandler>,
        store_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let decoy_hash = hasher
            .hash(&Uuid::new_v4().to_string())
            .context("Failed to prepare decoy password hash")?;

        Ok(Self {
            store,
            hasher,
            jwt,
            store_timeout,
            decoy_hash,
        })
    }

    pub fn jwt(&self) -> &JwtHandler {
        &self.jwt
    }

    /// Register a new user and hand back the stored record with its first token pair
    pub async fn signup(&self, req: SignupRequest) -> Result<User, AuthError> {
        let new_user = req.validate()?;

        // Both checks run before any write so every clash is reported at once
        let email_taken = with_deadline(
            self.store_timeout,
            self.store.count(&UserFilter::Email(new_user.email.clone())),
        )
        .await?;
        let phone_taken = with_deadline(
            self.store_timeout,
            self.store.count(&UserFilter::Phone(new_user.phone.clone())),
        )
        .await?;

        let mut conflicts = Vec::new();
        if email_taken > 0 {
            conflicts.push(ConflictField::Email);
        }
        if phone_taken > 0 {
            conflicts.push(ConflictField::Phone);
        }
        if !conflicts.is_empty() {
            warn!(email = %new_user.email, ?conflicts, "Signup rejected, duplicate user");
            return Err(AuthError::Conflict(conflicts));
        }

        let password_hash = self.hash_password(new_user.password).await?;

        let now = Utc::now();
        let mut user = User {
            id: Uuid::new_v4().to_string(),
            email: new_user.email,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            phone: new_user.phone,
            user_type: new_user.user_type,
            password_hash,
            token: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };

        let pair = self.jwt.issue(&user)?;
        user.token = Some(pair.token);
        user.refresh_token = Some(pair.refresh_token);

        // The unique indexes still catch a concurrent signup that slipped past the counts
        with_deadline(self.store_timeout, self.store.insert_one(&user)).await?;

        info!(
            user_id = %user.id,
            role = user.user_type.as_str(),
            "Created user"
        );
        Ok(user)
    }

    /// Check credentials, rotate the stored token pair, return the updated record
    pub async fn login(&self, req: LoginRequest) -> Result<User, AuthError> {
        let (email, password) = req.validate()?;

        let found = with_deadline(
            self.store_timeout,
            self.store.find_one(&UserFilter::Email(email.clone())),
        )
        .await?;

        // Unknown email and wrong password look the same to the caller, in body and in time
        let Some(user) = found else {
            self.verify_password(password, self.decoy_hash.clone()).await?;
            warn!(email = %email, "Failed login attempt: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify_password(password, user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "Failed login attempt: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.jwt.issue(&user)?;
        self.sync_session(&user.id, pair).await?;

        let refreshed = with_deadline(
            self.store_timeout,
            self.store.find_one(&UserFilter::Id(user.id.clone())),
        )
        .await?
        .ok_or(AuthError::NotFound)?;

        info!(
            user_id = %refreshed.id,
            role = refreshed.user_type.as_str(),
            "Login successful"
        );
        Ok(refreshed)
    }

    /// Single user read; USER callers may only see themselves
    pub async fn get_user(&self, caller: &Claims, user_id: &str) -> Result<User, AuthError> {
        authorize_claims(caller, Access::Single(user_id))?;

        with_deadline(
            self.store_timeout,
            self.store.find_one(&UserFilter::Id(user_id.to_string())),
        )
        .await?
        .ok_or(AuthError::NotFound)
    }

    /// Paginated listing, ADMIN only
    pub async fn list_users(&self, caller: &Claims, query: &PageQuery) -> Result<UserPage, AuthError> {
        authorize_claims(caller, Access::Collection)?;

        let (limit, page) = query.resolve();
        let result = with_deadline(
            self.store_timeout,
            self.store.list_page(query.offset(), limit),
        )
        .await?;

        info!(
            caller = %caller.uid,
            limit,
            page,
            total = result.total_count,
            "Listed users"
        );
        Ok(result)
    }

    /// Create the configured admin account unless that email already exists
    pub async fn bootstrap_admin(&self, seed: AdminSeed) -> Result<bool, AuthError> {
        let existing = with_deadline(
            self.store_timeout,
            self.store.count(&UserFilter::Email(seed.email.clone())),
        )
        .await?;
        if existing > 0 {
            return Ok(false);
        }

        let admin = self
            .signup(SignupRequest {
                email: Some(seed.email),
                first_name: Some("Admin".to_string()),
                last_name: Some("User".to_string()),
                phone: Some(seed.phone),
                password: Some(seed.password),
                user_type: Some(UserRole::Admin.as_str().to_string()),
            })
            .await?;

        warn!(email = %admin.email, "Bootstrap admin user created; rotate its password");
        Ok(true)
    }

    async fn sync_session(&self, user_id: &str, pair: TokenPair) -> Result<(), AuthError> {
        let patch = UserPatch {
            token: pair.token,
            refresh_token: pair.refresh_token,
            updated_at: Utc::now(),
        };
        let matched = with_deadline(
            self.store_timeout,
            self.store
                .update_one(&UserFilter::Id(user_id.to_string()), &patch),
        )
        .await?;

        if !matched {
            warn!(user_id, "Session sync matched no user");
            return Err(AuthError::NotFound);
        }
        Ok(())
    }

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(e.into()))?
            .map_err(AuthError::Internal)
    }

    async fn verify_password(&self, password: String, stored: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &stored))
            .await
            .map_err(|e| AuthError::Internal(e.into()))?
            .map_err(AuthError::Internal)
    }
}
