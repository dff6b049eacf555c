use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::error::{Error, Result};

use super::Store;

/// Durable registry backend, backed by a single SQLite table
/// (`id`, `name`, `address`, `is_active`, `created_at`, `updated_at`).
///
/// The round-robin cursor is process-local (not persisted): it is
/// rebuilt from scratch, starting at 0, on every process restart.
pub struct SqliteStore {
    pool: SqlitePool,
    rr_index: Mutex<HashMap<String, usize>>,
}

impl SqliteStore {
    /// Open (creating if absent) the SQLite database at `path` and run
    /// the schema migration.
    pub async fn connect(path: &str) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(opts).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS services (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                address TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_services_name ON services (name)")
            .execute(&pool)
            .await?;

        Ok(Self {
            pool,
            rr_index: Mutex::new(HashMap::new()),
        })
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Storage(e.into())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn register(&self, name: &str, address: &str) -> Result<()> {
        let existing =
            sqlx::query("SELECT id FROM services WHERE name = ? AND address = ?")
                .bind(name)
                .bind(address)
                .fetch_optional(&self.pool)
                .await?;

        if existing.is_some() {
            return Err(Error::AlreadyExists);
        }

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO services (name, address, is_active, created_at, updated_at) VALUES (?, ?, 1, ?, ?)",
        )
        .bind(name)
        .bind(address)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn deregister(&self, name: &str, address: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM services WHERE name = ? AND address = ?")
            .bind(name)
            .bind(address)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }

    async fn find_service_by_name(&self, name: &str) -> Result<String> {
        let rows = sqlx::query("SELECT address FROM services WHERE name = ? AND is_active = 1 ORDER BY id")
            .bind(name)
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Err(Error::NotFound);
        }

        let addrs: Vec<String> = rows.iter().map(|row| row.get::<String, _>("address")).collect();

        let mut rr = self.rr_index.lock();
        let cursor = *rr.get(name).unwrap_or(&0);
        let idx = cursor % addrs.len();
        rr.insert(name.to_string(), (cursor + 1) % addrs.len());

        Ok(addrs[idx].clone())
    }

    async fn list_services(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT name FROM services")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get::<String, _>("name")).collect())
    }

    async fn list_addrs(&self, name: &str) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT address FROM services WHERE name = ?")
            .bind(name)
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Err(Error::NotFound);
        }

        Ok(rows.iter().map(|row| row.get::<String, _>("address")).collect())
    }

    async fn list_all(&self) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query("SELECT name, address FROM services")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| (row.get::<String, _>("name"), row.get::<String, _>("address")))
            .collect())
    }

    async fn activate(&self, name: &str, address: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE services SET is_active = 1, updated_at = ? WHERE name = ? AND address = ?",
        )
        .bind(&now)
        .bind(name)
        .bind(address)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    async fn deactivate(&self, name: &str, address: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE services SET is_active = 0, updated_at = ? WHERE name = ? AND address = ?",
        )
        .bind(&now)
        .bind(name)
        .bind(address)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
