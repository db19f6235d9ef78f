//! User accounts

use cca_common::time::{from_db, from_db_opt, now, to_db};
use cca_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

const USER_COLUMNS: &str =
    "id, email, name, is_active, email_verified, created_at, last_login_at";

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        is_active: row.get::<i64, _>("is_active") != 0,
        email_verified: row.get::<i64, _>("email_verified") != 0,
        created_at: from_db(&row.get::<String, _>("created_at"))?,
        last_login_at: from_db_opt(row.get("last_login_at"))?,
    })
}

/// Insert a user; the email must already be normalized
///
/// A duplicate email is `Error::Conflict`.
pub async fn insert_user(
    pool: &SqlitePool,
    email: &str,
    name: Option<&str>,
    email_verified: bool,
) -> Result<User> {
    let id = Uuid::new_v4().to_string();
    let ts = to_db(now());

    let result = sqlx::query(
        "INSERT INTO users (id, email, name, email_verified, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(email)
    .bind(name)
    .bind(email_verified as i64)
    .bind(&ts)
    .bind(&ts)
    .execute(pool)
    .await
    .map_err(Error::Database);

    match result {
        Ok(_) => {}
        Err(e) if e.is_unique_violation() => {
            return Err(Error::Conflict(format!("Email already registered: {}", email)))
        }
        Err(e) => return Err(e),
    }

    find_by_id(pool, &id)
        .await?
        .ok_or_else(|| Error::Internal(format!("User {} vanished after insert", id)))
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(user_from_row).transpose()
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
    let row = sqlx::query(&sql).bind(email).fetch_optional(pool).await?;
    row.as_ref().map(user_from_row).transpose()
}

/// Mark the email verified and stamp the login time
pub async fn record_login(pool: &SqlitePool, id: &str) -> Result<()> {
    let ts = to_db(now());
    sqlx::query(
        "UPDATE users SET email_verified = 1, last_login_at = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&ts)
    .bind(&ts)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_active(pool: &SqlitePool, id: &str, active: bool) -> Result<()> {
    sqlx::query("UPDATE users SET is_active = ?, updated_at = ? WHERE id = ?")
        .bind(active as i64)
        .bind(to_db(now()))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
