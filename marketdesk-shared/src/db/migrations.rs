/// Embedded schema migrations
///
/// SQL files live in the workspace `migrations/` directory and are compiled
/// into the binary, so the API can bring a fresh database up to date at
/// start-up.
///
/// # Example
///
/// ```no_run
/// use marketdesk_shared::db::migrations::{migration_status, run_migrations};
/// use marketdesk_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// run_migrations(&pool).await?;
///
/// let status = migration_status(&pool).await?;
/// assert_eq!(status.pending, 0);
/// # Ok(())
/// # }
/// ```

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::PgPool;
use tracing::{error, info};

/// Migrations compiled into the binary
pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Applied vs. embedded migrations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Successfully applied migrations
    pub applied: usize,

    /// Embedded migrations not applied yet
    pub pending: usize,

    /// Highest applied version
    pub latest_version: Option<i64>,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.pending == 0
    }
}

/// Applies every pending migration
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    info!(embedded = MIGRATOR.iter().count(), "Running database migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        error!(error = %e, "Migration failed");
        e
    })?;

    info!("Database schema is up to date");
    Ok(())
}

/// Compares the applied migrations with the embedded ones
pub async fn migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_name = '_sqlx_migrations')",
    )
    .fetch_one(pool)
    .await?;

    let applied: Vec<i64> = if table_exists {
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success ORDER BY version")
            .fetch_all(pool)
            .await?
    } else {
        Vec::new()
    };

    Ok(status_of(&applied, MIGRATOR.iter().map(|m| m.version)))
}

fn status_of(applied: &[i64], embedded: impl Iterator<Item = i64>) -> MigrationStatus {
    MigrationStatus {
        applied: applied.len(),
        pending: embedded.filter(|version| !applied.contains(version)).count(),
        latest_version: applied.iter().max().copied(),
    }
}
