mod migrations;
mod models;
mod queries;

pub use models::*;
pub use queries::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::info;

/// Handle to the topics database. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database at `path` and bring its
    /// schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, is not writable, or a
    /// migration fails.
    pub async fn new(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            // A manual check from the web API can race the scheduled sweep;
            // without a busy timeout that surfaces as immediate SQLITE_BUSY.
            .busy_timeout(Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite database at {}", path.display()))?;

        let db = Self { pool };
        migrations::run(&db.pool).await?;
        info!("Database migrations complete");
        db.verify_writable(path).await?;

        Ok(db)
    }

    /// Fail fast on read-only deployments (e.g. a data volume mounted with
    /// the wrong ownership) instead of erroring mid-check later. Beginning a
    /// transaction is the cheapest operation that requires write capability.
    async fn verify_writable(&self, path: &Path) -> Result<()> {
        let tx = self.pool.begin().await.with_context(|| {
            format!(
                "SQLite database at {} is not writable; check mount permissions",
                path.display()
            )
        })?;
        tx.commit()
            .await
            .context("Failed to commit SQLite writability probe")
    }

    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
