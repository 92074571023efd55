//! SQLite store — the durable user-record backend.
//!
//! A single `user_records` table keyed by the external user id. WAL journal
//! mode so the gateway's concurrent readers never block the writer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use codetutor_core::error::StoreError;
use codetutor_core::record::{UserRecord, UserRecordStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A durable SQLite user-record store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store from a file path.
    ///
    /// The database and table are created automatically.
    /// Pass `":memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite user-record store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_records (
                user_id       TEXT PRIMARY KEY,
                authorized    INTEGER NOT NULL DEFAULT 0,
                rate_limit_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("user_records table: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<UserRecord, StoreError> {
        let authorized: i64 = row
            .try_get("authorized")
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let rate_limit_at: String = row
            .try_get("rate_limit_at")
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        let rate_limit_at = DateTime::parse_from_rfc3339(&rate_limit_at)
            .map_err(|e| StoreError::Storage(format!("bad rate_limit_at: {e}")))?
            .with_timezone(&Utc);

        Ok(UserRecord {
            authorized: authorized != 0,
            rate_limit_at,
        })
    }
}

#[async_trait]
impl UserRecordStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT authorized, rate_limit_at FROM user_records WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn insert(&self, user_id: &str, record: UserRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO user_records (user_id, authorized, rate_limit_at) VALUES (?1, ?2, ?3)",
        )
        .bind(user_id)
        .bind(record.authorized as i64)
        .bind(record.rate_limit_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn update_rate_limit(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE user_records SET rate_limit_at = ?2 WHERE user_id = ?1",
        )
        .bind(user_id)
        .bind(at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Storage(format!(
                "no record for user '{user_id}'"
            )));
        }

        Ok(())
    }
}
