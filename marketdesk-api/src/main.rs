//! # MarketDesk API Server
//!
//! Serves the MarketDesk HTTP API: account registration and login for
//! administrators, seeking organizations and users, administration of
//! accounts and master data, and engagement pricing.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p marketdesk-api
//! ```

use anyhow::Context;
use marketdesk_api::{
    app::{build_router, AppState},
    config::Config,
};
use marketdesk_shared::{
    auth::provider::{ensure_administrator, SessionAuthenticator},
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marketdesk_api=debug,marketdesk_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "MarketDesk API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("Failed to connect to database")?;

    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    if let Some(admin) = &config.auth.bootstrap_admin {
        let created = ensure_administrator(&pool, &admin.login_id, &admin.password)
            .await
            .context("Failed to create bootstrap administrator")?;
        if created {
            tracing::info!(login_id = %admin.login_id, "Bootstrap administrator created");
        }
    }

    let auth = SessionAuthenticator::new(
        pool.clone(),
        config.auth.jwt_secret.clone(),
        config.auth.session_policies(),
    );

    let bind_address = config.bind_address();
    let state = AppState::new(pool.clone(), config, Arc::new(auth));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        // Keep serving; the process can still be killed
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
