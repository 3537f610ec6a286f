//! Service Configuration
//! Mission: Read every setting from flags or the environment (`.env` honored)

use crate::auth::jwt::{ACCESS_TOKEN_TTL_HOURS, REFRESH_TOKEN_TTL_HOURS};
use crate::auth::password::DEFAULT_BCRYPT_COST;
use crate::auth::service::AdminSeed;
use anyhow::{bail, Result};
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "authgate")]
#[command(about = "User signup/login service issuing signed session tokens")]
pub struct Config {
    /// HMAC signing secret for all issued tokens
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind_addr: String,

    #[arg(long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// SQLite file holding user accounts
    #[arg(long, env = "AUTH_DB_PATH", default_value = "authgate.db")]
    pub db_path: String,

    /// Deadline for each storage call
    #[arg(long, env = "STORE_TIMEOUT_SECS", default_value = "100")]
    pub store_timeout_secs: u64,

    #[arg(long, env = "BCRYPT_COST", default_value_t = DEFAULT_BCRYPT_COST,
          value_parser = clap::value_parser!(u32).range(4..=31))]
    pub bcrypt_cost: u32,

    #[arg(long, env = "ACCESS_TOKEN_TTL_HOURS", default_value_t = ACCESS_TOKEN_TTL_HOURS)]
    pub access_ttl_hours: i64,

    #[arg(long, env = "REFRESH_TOKEN_TTL_HOURS", default_value_t = REFRESH_TOKEN_TTL_HOURS)]
    pub refresh_ttl_hours: i64,

    /// Seed an ADMIN account with this email at startup
    #[arg(long, env = "ADMIN_EMAIL")]
    pub admin_email: Option<String>,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    #[arg(long, env = "ADMIN_PHONE", default_value = "0000000000")]
    pub admin_phone: String,
}

impl Config {
    /// Load `.env`, then parse flags with environment fallbacks
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::parse()
    }

    pub fn validate(&self) -> Result<()> {
        if self.secret_key.trim().is_empty() {
            bail!("SECRET_KEY must not be empty");
        }
        if self.access_ttl_hours <= 0 || self.refresh_ttl_hours <= 0 {
            bail!("token lifetimes must be positive");
        }
        if self.store_timeout_secs == 0 {
            bail!("STORE_TIMEOUT_SECS must be at least 1");
        }
        if self.admin_email.is_some() != self.admin_password.is_some() {
            bail!("ADMIN_EMAIL and ADMIN_PASSWORD must be set together");
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn admin_seed(&self) -> Option<AdminSeed> {
        match (&self.admin_email, &self.admin_password) {
            (Some(email), Some(password)) => Some(AdminSeed {
                email: email.clone(),
                password: password.clone(),
                phone: self.admin_phone.clone(),
            }),
            _ => None,
        }
    }
}
