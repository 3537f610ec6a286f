//! authgate - user signup/login service
//! Mission: Issue signed session tokens and gate user data by role

use anyhow::{Context, Result};
use authgate_backend::{
    app::build_router,
    auth::{AuthService, BcryptHasher, JwtHandler, SqliteUserStore},
    config::Config,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    let config = Config::from_env();
    init_tracing();
    config.validate()?;

    info!("🚀 authgate starting");

    let user_store = Arc::new(
        SqliteUserStore::new(&config.db_path)
            .with_context(|| format!("Failed to open user store at {}", config.db_path))?,
    );
    let jwt_handler = Arc::new(
        JwtHandler::new(config.secret_key.clone())
            .with_ttl_hours(config.access_ttl_hours, config.refresh_ttl_hours),
    );
    let hasher = Arc::new(BcryptHasher::new(config.bcrypt_cost));

    let service = Arc::new(AuthService::new(
        user_store,
        hasher,
        jwt_handler,
        config.store_timeout(),
    )?);

    info!(
        db_path = %config.db_path,
        store_timeout_secs = config.store_timeout_secs,
        "🔐 Authentication initialized"
    );

    if let Some(seed) = config.admin_seed() {
        service
            .bootstrap_admin(seed)
            .await
            .context("Failed to bootstrap admin user")?;
    }

    let app = build_router(service);

    // Start server
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("🎯 API server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}

/// Initialize tracing with env-driven filtering
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "authgate=info,authgate_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
