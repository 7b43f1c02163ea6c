use sqlx::SqlitePool;
use washsync_core::SyncResult;

/// SQL statements for the client-side key-value store.
pub struct Queries;

impl Queries {
    /// Schema for the local store. Everything the client persists lives in
    /// one key-value table; components serialize whole records as JSON and
    /// replace them wholesale.
    pub const SCHEMA: &'static str = r#"
        CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
    "#;

    pub const GET_VALUE: &'static str = r#"
        SELECT value FROM kv WHERE key = ?1
    "#;

    pub const UPSERT_VALUE: &'static str = r#"
        INSERT INTO kv (key, value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
    "#;

    pub const DELETE_VALUE: &'static str = r#"
        DELETE FROM kv WHERE key = ?1
    "#;
}

/// Helper functions for store maintenance.
pub struct DbHelpers;

impl DbHelpers {
    /// Initialize the store schema.
    pub async fn init_schema(pool: &SqlitePool) -> SyncResult<()> {
        sqlx::query(Queries::SCHEMA).execute(pool).await?;
        tracing::debug!("STORE: Schema initialized");
        Ok(())
    }
}
