//! Read-only view of accounts owned by the auth service

use cca_common::Result;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

pub async fn find_user(pool: &SqlitePool, user_id: &str) -> Result<Option<UserSummary>> {
    let row = sqlx::query("SELECT id, email, name FROM users WHERE id = ? AND is_active = 1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| UserSummary {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
    }))
}
