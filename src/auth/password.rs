//! Credential Hashing
//! Mission: One-way password storage behind a swappable seam

use anyhow::{Context, Result};
use bcrypt::{hash, verify};

pub const DEFAULT_BCRYPT_COST: u32 = 14;

/// Hashes plaintext secrets and checks plaintext against stored hashes
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String>;

    /// `Ok(false)` for a wrong password; `Err` only when the stored hash is unusable
    fn verify(&self, plaintext: &str, stored_hash: &str) -> Result<bool>;
}

/// bcrypt with a fixed work factor
#[derive(Debug, Clone)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String> {
        hash(plaintext, self.cost).context("Failed to hash password")
    }

    fn verify(&self, plaintext: &str, stored_hash: &str) -> Result<bool> {
        verify(plaintext, stored_hash).context("Failed to verify password")
    }
}
