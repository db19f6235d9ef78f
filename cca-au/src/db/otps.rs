//! Email one-time codes

use cca_common::time::{from_db, now, to_db};
use cca_common::Result;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct OtpRecord {
    pub id: String,
    pub email: String,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: u32,
    pub consumed: bool,
    pub created_at: DateTime<Utc>,
}

/// Most recently issued code for an email, consumed or not
pub async fn latest_for_email(pool: &SqlitePool, email: &str) -> Result<Option<OtpRecord>> {
    let row = sqlx::query(
        "SELECT id, email, code_hash, expires_at, attempts, consumed, created_at
         FROM email_otps WHERE email = ? ORDER BY created_at DESC LIMIT 1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(OtpRecord {
        id: row.get("id"),
        email: row.get("email"),
        code_hash: row.get("code_hash"),
        expires_at: from_db(&row.get::<String, _>("expires_at"))?,
        attempts: row.get::<i64, _>("attempts") as u32,
        consumed: row.get::<i64, _>("consumed") != 0,
        created_at: from_db(&row.get::<String, _>("created_at"))?,
    }))
}

/// Store a new code, retiring any code still outstanding for the email
pub async fn replace_active(
    pool: &SqlitePool,
    email: &str,
    code_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE email_otps SET consumed = 1 WHERE email = ? AND consumed = 0")
        .bind(email)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO email_otps (id, email, code_hash, expires_at, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(email)
    .bind(code_hash)
    .bind(to_db(expires_at))
    .bind(to_db(now()))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(id)
}

/// Count a wrong guess; returns the new attempt count
pub async fn record_failed_attempt(pool: &SqlitePool, id: &str) -> Result<u32> {
    let attempts: i64 =
        sqlx::query_scalar("UPDATE email_otps SET attempts = attempts + 1 WHERE id = ? RETURNING attempts")
            .bind(id)
            .fetch_one(pool)
            .await?;
    Ok(attempts as u32)
}

/// Mark a code used; false if it was already consumed
pub async fn consume(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE email_otps SET consumed = 1 WHERE id = ? AND consumed = 0")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}
