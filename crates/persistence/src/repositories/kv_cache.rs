//! Key-value cache backed by the `kv_cache` table.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct KvCacheRepository {
    pool: SqlitePool,
}

impl KvCacheRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Value stored under `key`, ignoring entries expired at `now`.
    pub async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<String>, sqlx::Error> {
        let timer = QueryTimer::new("kv_cache_get");
        let result: Result<Option<(String,)>, sqlx::Error> = sqlx::query_as(
            "SELECT value FROM kv_cache WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
        )
        .bind(key)
        .bind(now)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map(|row| row.map(|(value,)| value))
    }

    pub async fn put(
        &self,
        key: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("kv_cache_put");
        let result = sqlx::query(
            r#"
            INSERT INTO kv_cache (key, value, expires_at, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn delete(&self, key: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("kv_cache_delete");
        let result = sqlx::query("DELETE FROM kv_cache WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }
}
