pub mod sqlite_store;

pub use sqlite_store::SqliteMetricsStore;

use anyhow::{Context, Result};
use monitor_config::StorageConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS samples (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        entity_id TEXT NOT NULL,
        timestamp_ms INTEGER NOT NULL,
        viewer_count INTEGER NOT NULL,
        like_count INTEGER NOT NULL,
        comment_count INTEGER NOT NULL,
        chat_message_count INTEGER NOT NULL,
        subscriber_count INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_samples_entity_time ON samples (entity_id, timestamp_ms)",
    r#"
    CREATE TABLE IF NOT EXISTS aggregates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        entity_id TEXT NOT NULL,
        period_type TEXT NOT NULL,
        period_start_ms INTEGER NOT NULL,
        period_end_ms INTEGER NOT NULL,
        average_viewers REAL NOT NULL,
        peak_viewers INTEGER NOT NULL,
        sample_count INTEGER NOT NULL,
        duration_seconds INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_aggregates_entity_period ON aggregates (entity_id, period_type, period_end_ms)",
    r#"
    CREATE TABLE IF NOT EXISTS profiles (
        entity_id TEXT PRIMARY KEY,
        channel_id TEXT NOT NULL,
        channel_name TEXT NOT NULL,
        description TEXT NOT NULL,
        subscriber_count INTEGER NOT NULL,
        view_count INTEGER NOT NULL,
        video_count INTEGER NOT NULL,
        fetched_at_ms INTEGER NOT NULL
    )
    "#,
];

pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .with_context(|| format!("invalid database url: {}", config.database_url))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .context("failed to open sqlite pool")?;

        info!(url = %config.database_url, "sqlite pool opened");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("failed to apply schema")?;
        }
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
