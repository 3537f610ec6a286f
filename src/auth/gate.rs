//! Authorization Gate
//! Mission: Decide allow/deny from a verified caller and the resource it targets

use crate::auth::errors::AuthError;
use crate::auth::models::{Claims, UserRole};

/// What the caller is trying to reach
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access<'a> {
    /// One user record, by id
    Single(&'a str),
    /// The whole user collection
    Collection,
}

/// Self-access for USER, everything for ADMIN, listing for ADMIN only.
pub fn authorize(role: UserRole, caller_id: &str, access: Access<'_>) -> Result<(), AuthError> {
    let allowed = match (role, access) {
        (UserRole::Admin, _) => true,
        (UserRole::User, Access::Single(target)) => caller_id == target,
        (UserRole::User, Access::Collection) => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(AuthError::Unauthorized)
    }
}

/// Convenience over verified claims
pub fn authorize_claims(claims: &Claims, access: Access<'_>) -> Result<(), AuthError> {
    authorize(claims.user_type, &claims.uid, access)
}
