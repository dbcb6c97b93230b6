use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Row, SqlitePool};

/// Thin key-value wrapper over the `kv` table.
///
/// Values are stored as JSON text so heterogeneous records (second
/// counters, channel ids, snipe lists) share one table. Writes are durable
/// once the statement commits; reads of an absent key return `None`.
#[derive(Clone)]
pub struct KvStore {
    pool: SqlitePool,
}

impl KvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("kv get failed for key {key}"))?;

        match row {
            Some(row) => {
                let raw: String = row.get("value");
                let value = serde_json::from_str(&raw)
                    .with_context(|| format!("kv value for key {key} is not valid JSON"))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        sqlx::query(
            "INSERT INTO kv (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(raw)
        .execute(&self.pool)
        .await
        .with_context(|| format!("kv set failed for key {key}"))?;

        Ok(())
    }

    /// Every stored entry as (key, raw JSON value), in insertion order.
    pub async fn all(&self) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query("SELECT key, value FROM kv ORDER BY rowid ASC")
            .fetch_all(&self.pool)
            .await
            .context("kv scan failed")?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get("key"), row.get("value")))
            .collect())
    }
}
