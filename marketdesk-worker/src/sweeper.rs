/// Expired session sweeper
///
/// Sessions carry an absolute expiry and are rejected once it passes, but
/// rows of sessions that are never presented again would stay forever. The
/// sweeper deletes them periodically.
///
/// # Architecture
///
/// ```text
/// SessionSweeper
///   ├─> sweep immediately on start
///   ├─> sleep `interval_secs` (or stop on shutdown)
///   └─> ExpiredSessionStore::delete_expired(now)
/// ```
///
/// A failed sweep is logged and retried on the next tick.
///
/// # Example
///
/// ```no_run
/// use marketdesk_worker::sweeper::{SessionSweeper, SweeperConfig};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> anyhow::Result<()> {
/// let sweeper = SessionSweeper::new(pool, SweeperConfig::default());
/// let shutdown = sweeper.shutdown_token();
///
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     shutdown.cancel();
/// });
///
/// sweeper.run().await;
/// # Ok(())
/// # }
/// ```

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marketdesk_shared::models::session::Session;
use sqlx::PgPool;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

/// Default pause between sweeps
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Sweeper configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweeperConfig {
    /// Pause between sweeps in seconds
    pub interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        SweeperConfig {
            interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl SweeperConfig {
    /// Reads `SWEEP_INTERVAL_SECS` (default: 300)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let interval_secs = match lookup("SWEEP_INTERVAL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .context("SWEEP_INTERVAL_SECS must be a whole number of seconds")?,
            None => DEFAULT_SWEEP_INTERVAL_SECS,
        };

        if interval_secs == 0 {
            bail!("SWEEP_INTERVAL_SECS must be positive");
        }

        Ok(SweeperConfig { interval_secs })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Storage the sweeper deletes expired sessions from
#[async_trait]
pub trait ExpiredSessionStore: Send + Sync {
    /// Deletes sessions expired at `now`, returning how many were removed
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error>;
}

#[async_trait]
impl ExpiredSessionStore for PgPool {
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        Session::delete_expired(self, now).await
    }
}

/// Periodic expired-session cleanup
pub struct SessionSweeper<S = PgPool> {
    store: S,
    config: SweeperConfig,
    shutdown_token: CancellationToken,
}

impl<S: ExpiredSessionStore> SessionSweeper<S> {
    pub fn new(store: S, config: SweeperConfig) -> Self {
        SessionSweeper {
            store,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Token that stops [`run`](Self::run) when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs one sweep
    pub async fn sweep_once(&self) -> Result<u64, sqlx::Error> {
        let deleted = self.store.delete_expired(Utc::now()).await?;

        if deleted > 0 {
            tracing::info!(deleted, "Deleted expired sessions");
        } else {
            tracing::debug!("No expired sessions");
        }

        Ok(deleted)
    }

    /// Sweeps until the shutdown token is cancelled
    pub async fn run(&self) {
        tracing::info!(interval_secs = self.config.interval_secs, "Session sweeper starting");

        loop {
            if let Err(e) = self.sweep_once().await {
                tracing::error!(error = %e, "Session sweep failed");
            }

            tokio::select! {
                _ = self.shutdown_token.cancelled() => break,
                _ = sleep(self.config.interval()) => {}
            }
        }

        tracing::info!("Session sweeper stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    /// Counts sweeps; fails the first `failures` of them
    #[derive(Default)]
    struct CountingStore {
        calls: AtomicU64,
        failures: u64,
    }

    #[async_trait]
    impl ExpiredSessionStore for Arc<CountingStore> {
        async fn delete_expired(&self, _now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(sqlx::Error::PoolTimedOut)
            } else {
                Ok(2)
            }
        }
    }

    fn lookup(vars: &[(&str, &str)]) -> anyhow::Result<SweeperConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SweeperConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_config_from_lookup() {
        assert_eq!(lookup(&[]).unwrap(), SweeperConfig::default());
        assert_eq!(lookup(&[("SWEEP_INTERVAL_SECS", "60")]).unwrap().interval_secs, 60);
        assert!(lookup(&[("SWEEP_INTERVAL_SECS", "0")]).is_err());
        assert!(lookup(&[("SWEEP_INTERVAL_SECS", "soon")]).is_err());
    }

    #[tokio::test]
    async fn test_sweep_once_reports_deleted_count() {
        let store = Arc::new(CountingStore::default());
        let sweeper = SessionSweeper::new(store.clone(), SweeperConfig::default());

        assert_eq!(sweeper.sweep_once().await.unwrap(), 2);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sweeps_every_interval_until_shutdown() {
        let store = Arc::new(CountingStore::default());
        let sweeper = Arc::new(SessionSweeper::new(
            store.clone(),
            SweeperConfig { interval_secs: 10 },
        ));
        let shutdown = sweeper.shutdown_token();

        let handle = tokio::spawn({
            let sweeper = sweeper.clone();
            async move { sweeper.run().await }
        });

        // Sweeps at 0s, 10s, 20s and 30s
        sleep(Duration::from_secs(35)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(store.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_sweeps_do_not_stop_the_loop() {
        let store = Arc::new(CountingStore {
            calls: AtomicU64::new(0),
            failures: 2,
        });
        let sweeper = Arc::new(SessionSweeper::new(
            store.clone(),
            SweeperConfig { interval_secs: 5 },
        ));
        let shutdown = sweeper.shutdown_token();

        let handle = tokio::spawn({
            let sweeper = sweeper.clone();
            async move { sweeper.run().await }
        });

        sleep(Duration::from_secs(12)).await;
        shutdown.cancel();
        handle.await.unwrap();

        // Two failures followed by a successful sweep
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_sweeps_once() {
        let store = Arc::new(CountingStore::default());
        let sweeper = SessionSweeper::new(store.clone(), SweeperConfig::default());

        sweeper.shutdown_token().cancel();
        sweeper.run().await;

        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }
}
