//! libSQL-backed durable store

use async_trait::async_trait;
use libsql::{params, Builder, Connection, Database};
use serde_json::Value;
use std::path::Path;

use super::DurableStore;
use crate::error::Result;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// On-device durable store backed by a local libSQL database.
///
/// One row per record, keyed by (bucket, key). Opened with
/// `synchronous = FULL` so an acknowledged write survives a crash.
pub struct LibSqlStore {
    _db: Database,
    conn: Connection,
}

impl LibSqlStore {
    /// Open a store at the given path, creating it if it doesn't exist.
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        Self::open_internal(&path_str).await
    }

    /// Open an in-memory store (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        Self::open_internal(":memory:").await
    }

    async fn open_internal(path: &str) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        let store = Self { _db: db, conn };
        store.configure().await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Configure `SQLite` for queue durability
    async fn configure(&self) -> Result<()> {
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok(); // Not supported on every backend
        // FULL, not NORMAL: an acknowledged enqueue must survive power loss
        self.conn
            .execute("PRAGMA synchronous = FULL;", ())
            .await
            .ok();
        self.conn.execute("PRAGMA foreign_keys = ON;", ()).await?;
        Ok(())
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        let version = self.schema_version().await?;
        if version < 1 {
            self.migrate_v1().await?;
        }
        Ok(())
    }

    /// Get the current schema version
    async fn schema_version(&self) -> Result<i32> {
        let mut rows = self
            .conn
            .query(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                (),
            )
            .await?;

        let exists = match rows.next().await? {
            Some(row) => row.get::<i32>(0)? != 0,
            None => false,
        };
        if !exists {
            return Ok(0);
        }

        let mut rows = self
            .conn
            .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
            .await?;

        let version = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(version)
    }

    /// Migration to version 1: Initial schema
    async fn migrate_v1(&self) -> Result<()> {
        // libsql doesn't have execute_batch, so we run each statement
        // separately inside a transaction
        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        let statements = [
            // Schema version tracking
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            // Durable records, one row per (bucket, key)
            "CREATE TABLE IF NOT EXISTS durable_records (
                bucket TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (bucket, key)
            )",
            "CREATE INDEX IF NOT EXISTS idx_durable_records_bucket ON durable_records(bucket)",
            // Record migration version
            "INSERT INTO schema_version (version) VALUES (1)",
        ];

        for stmt in statements {
            if let Err(e) = self.conn.execute(stmt, ()).await {
                self.conn.execute("ROLLBACK", ()).await.ok();
                return Err(e.into());
            }
        }

        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        tracing::info!("Migrated durable store to version {CURRENT_VERSION}");
        Ok(())
    }
}

#[async_trait]
impl DurableStore for LibSqlStore {
    async fn put(&self, bucket: &str, key: &str, value: &Value) -> Result<()> {
        let serialized = serde_json::to_string(value)?;
        self.conn
            .execute(
                "INSERT INTO durable_records (bucket, key, value) VALUES (?, ?, ?)
                 ON CONFLICT(bucket, key) DO UPDATE SET value = excluded.value",
                params![bucket, key, serialized],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Value>> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM durable_records WHERE bucket = ? AND key = ?",
                params![bucket, key],
            )
            .await?;

        match rows.next().await? {
            Some(row) => {
                let raw: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM durable_records WHERE bucket = ? AND key = ?",
                params![bucket, key],
            )
            .await?;
        Ok(())
    }

    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT key FROM durable_records WHERE bucket = ?",
                params![bucket],
            )
            .await?;

        let mut keys = Vec::new();
        while let Some(row) = rows.next().await? {
            keys.push(row.get(0)?);
        }
        Ok(keys)
    }
}
