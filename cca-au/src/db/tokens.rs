//! Issued token pairs
//!
//! Only SHA-256 digests are stored. A user holds at most one live pair:
//! issuing a pair revokes every other unrevoked pair in the same
//! transaction.

use cca_common::time::{from_db, now, to_db};
use cca_common::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub id: String,
    pub user_id: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub revoked: bool,
}

/// Digests and expiries for a pair about to be stored
#[derive(Debug, Clone)]
pub struct NewPair<'a> {
    pub access_token_hash: &'a str,
    pub refresh_token_hash: &'a str,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

fn record_from_row(row: &SqliteRow) -> Result<TokenRecord> {
    Ok(TokenRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        access_expires_at: from_db(&row.get::<String, _>("access_expires_at"))?,
        refresh_expires_at: from_db(&row.get::<String, _>("refresh_expires_at"))?,
        revoked: row.get::<i64, _>("revoked") != 0,
    })
}

const RECORD_COLUMNS: &str = "id, user_id, access_expires_at, refresh_expires_at, revoked";

pub async fn find_by_refresh_hash(pool: &SqlitePool, hash: &str) -> Result<Option<TokenRecord>> {
    let sql = format!("SELECT {} FROM refresh_tokens WHERE refresh_token_hash = ?", RECORD_COLUMNS);
    let row = sqlx::query(&sql).bind(hash).fetch_optional(pool).await?;
    row.as_ref().map(record_from_row).transpose()
}

pub async fn find_by_access_hash(pool: &SqlitePool, hash: &str) -> Result<Option<TokenRecord>> {
    let sql = format!("SELECT {} FROM refresh_tokens WHERE access_token_hash = ?", RECORD_COLUMNS);
    let row = sqlx::query(&sql).bind(hash).fetch_optional(pool).await?;
    row.as_ref().map(record_from_row).transpose()
}

/// Store a new pair for `user_id`, revoking all of the user's other pairs
///
/// With `rotating_from`, the old pair must still be live: if another request
/// already revoked it, nothing is written and `None` is returned.
pub async fn issue_pair(
    pool: &SqlitePool,
    user_id: &str,
    pair: NewPair<'_>,
    rotating_from: Option<&str>,
) -> Result<Option<String>> {
    let id = Uuid::new_v4().to_string();
    let ts = to_db(now());
    let mut tx = pool.begin().await?;

    if let Some(old_id) = rotating_from {
        let rotated = sqlx::query(
            "UPDATE refresh_tokens SET revoked = 1, revoked_at = ?, replaced_by = ?
             WHERE id = ? AND revoked = 0",
        )
        .bind(&ts)
        .bind(&id)
        .bind(old_id)
        .execute(&mut *tx)
        .await?;

        if rotated.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(None);
        }
    }

    sqlx::query(
        "UPDATE refresh_tokens SET revoked = 1, revoked_at = ? WHERE user_id = ? AND revoked = 0",
    )
    .bind(&ts)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO refresh_tokens
         (id, user_id, access_token_hash, refresh_token_hash, access_expires_at, refresh_expires_at, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(user_id)
    .bind(pair.access_token_hash)
    .bind(pair.refresh_token_hash)
    .bind(to_db(pair.access_expires_at))
    .bind(to_db(pair.refresh_expires_at))
    .bind(&ts)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(id))
}

/// Revoke one pair; false if it was already revoked
pub async fn revoke(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked = 1, revoked_at = ? WHERE id = ? AND revoked = 0",
    )
    .bind(to_db(now()))
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Revoke every live pair of a user; returns how many were live
pub async fn revoke_all_for_user(pool: &SqlitePool, user_id: &str) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked = 1, revoked_at = ? WHERE user_id = ? AND revoked = 0",
    )
    .bind(to_db(now()))
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn count_live_for_user(pool: &SqlitePool, user_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ? AND revoked = 0",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
