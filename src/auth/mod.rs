//! Authentication Module
//! Mission: Signup/login with signed session tokens and role-gated user access

pub mod api;
pub mod errors;
pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod token;
pub mod user_store;

pub use api::AuthState;
pub use errors::AuthError;
pub use jwt::JwtHandler;
pub use middleware::auth_middleware;
pub use password::{BcryptHasher, CredentialHasher};
pub use service::AuthService;
pub use user_store::{SqliteUserStore, UserRepository};
