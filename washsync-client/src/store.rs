use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use washsync_core::SyncResult;

use crate::queries::{DbHelpers, Queries};

/// Key-value persistence that survives process restarts. Callers store whole
/// JSON records under fixed keys and always read-modify-write the full value.
/// A single writing process is assumed; concurrent writers would race on the
/// read-modify-write cycle.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Returns the stored value for `key`, or `None` if the key is absent.
    async fn get(&self, key: &str) -> SyncResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> SyncResult<()>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> SyncResult<()>;
}

/// SQLite-backed [`DurableStore`].
pub struct SqliteStore {
    pub pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (or creates) the database at `database_url`.
    pub async fn new(database_url: &str) -> SyncResult<Self> {
        // A pooled in-memory SQLite gives every connection its own empty
        // database; pin those to a single connection so state is shared.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        tracing::info!("STORE: Connected to {}", database_url);
        Ok(Self { pool })
    }

    /// Run database migrations to set up the schema.
    pub async fn run_migrations(&self) -> SyncResult<()> {
        DbHelpers::init_schema(&self.pool).await
    }

    /// Closes the underlying pool. Safe to call more than once.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl DurableStore for SqliteStore {
    async fn get(&self, key: &str) -> SyncResult<Option<String>> {
        let row = sqlx::query(Queries::GET_VALUE)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> SyncResult<()> {
        sqlx::query(Queries::UPSERT_VALUE)
            .bind(key)
            .bind(value)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        tracing::debug!("STORE: Wrote {} ({} bytes)", key, value.len());
        Ok(())
    }

    async fn remove(&self, key: &str) -> SyncResult<()> {
        sqlx::query(Queries::DELETE_VALUE)
            .bind(key)
            .execute(&self.pool)
            .await?;

        tracing::debug!("STORE: Removed {}", key);
        Ok(())
    }
}
