//! Runtime settings accessors
//!
//! Values live in the `settings` table as text. Typed getters fall back to
//! the compiled default when a row is missing.

use crate::{Error, Result};
use sqlx::SqlitePool;
use std::time::Duration;

/// Generic setting getter
pub async fn get_setting<T>(db: &SqlitePool, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match row {
        Some((Some(value),)) => {
            let parsed = value
                .trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

/// Generic setting setter (upsert)
pub async fn set_setting<T>(db: &SqlitePool, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}

async fn get_seconds(db: &SqlitePool, key: &str, default: u64) -> Result<Duration> {
    get_setting::<u64>(db, key)
        .await
        .map(|opt| Duration::from_secs(opt.unwrap_or(default)))
}

pub async fn completion_cache_ttl(db: &SqlitePool) -> Result<Duration> {
    get_seconds(db, "completion_cache_ttl_seconds", 300).await
}

pub async fn questions_cache_ttl(db: &SqlitePool) -> Result<Duration> {
    get_seconds(db, "questions_cache_ttl_seconds", 3600).await
}

pub async fn insights_cache_ttl(db: &SqlitePool) -> Result<Duration> {
    get_seconds(db, "insights_cache_ttl_seconds", 86_400).await
}

pub async fn job_max_retries(db: &SqlitePool) -> Result<u32> {
    get_setting(db, "job_max_retries").await.map(|opt| opt.unwrap_or(3))
}

pub async fn job_backoff_base(db: &SqlitePool) -> Result<Duration> {
    get_setting::<u64>(db, "job_backoff_base_ms")
        .await
        .map(|opt| Duration::from_millis(opt.unwrap_or(1000)))
}

pub async fn otp_ttl(db: &SqlitePool) -> Result<Duration> {
    get_seconds(db, "otp_ttl_seconds", 600).await
}

pub async fn otp_resend_cooldown(db: &SqlitePool) -> Result<Duration> {
    get_seconds(db, "otp_resend_cooldown_seconds", 60).await
}

pub async fn otp_max_attempts(db: &SqlitePool) -> Result<u32> {
    get_setting(db, "otp_max_attempts").await.map(|opt| opt.unwrap_or(5))
}

pub async fn access_token_ttl(db: &SqlitePool) -> Result<Duration> {
    get_seconds(db, "access_token_ttl_seconds", 900).await
}

pub async fn refresh_token_ttl(db: &SqlitePool) -> Result<Duration> {
    get_seconds(db, "refresh_token_ttl_seconds", 2_592_000).await
}

pub async fn sse_heartbeat_interval(db: &SqlitePool) -> Result<Duration> {
    get_setting::<u64>(db, "sse_heartbeat_interval_ms")
        .await
        .map(|opt| Duration::from_millis(opt.unwrap_or(15_000)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::create_settings_table;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_settings_table(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_missing_setting_uses_default() {
        let pool = setup().await;
        assert_eq!(job_max_retries(&pool).await.unwrap(), 3);
        assert_eq!(otp_ttl(&pool).await.unwrap(), Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_set_then_get_roundtrip() {
        let pool = setup().await;
        set_setting(&pool, "job_max_retries", 7).await.unwrap();
        assert_eq!(job_max_retries(&pool).await.unwrap(), 7);

        set_setting(&pool, "job_max_retries", 2).await.unwrap();
        assert_eq!(job_max_retries(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unparseable_setting_is_config_error() {
        let pool = setup().await;
        set_setting(&pool, "otp_max_attempts", "many").await.unwrap();
        let err = otp_max_attempts(&pool).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
