//! # MarketDesk Worker
//!
//! Background process that keeps the session table clean by deleting
//! expired sessions every `SWEEP_INTERVAL_SECS` seconds.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p marketdesk-worker
//! ```

use anyhow::Context;
use marketdesk_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig},
};
use marketdesk_worker::sweeper::{SessionSweeper, SweeperConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marketdesk_worker=debug,marketdesk_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "MarketDesk Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;
    let sweeper_config = SweeperConfig::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: database_url,
        max_connections: 2,
        ..Default::default()
    })
    .await
    .context("Failed to connect to database")?;

    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let sweeper = SessionSweeper::new(pool.clone(), sweeper_config);
    let shutdown = sweeper.shutdown_token();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                return;
            }
        }
        shutdown.cancel();
    });

    sweeper.run().await;

    close_pool(pool).await;
    tracing::info!("Worker shut down");

    Ok(())
}
