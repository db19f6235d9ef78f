//! Contact messages

use cca_common::pagination::Pagination;
use cca_common::time::{from_db, now, to_db};
use cca_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Validated fields of a new message
#[derive(Debug, Clone)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

const CONTACT_COLUMNS: &str = "id, name, email, subject, message, created_at";

fn contact_from_row(row: &SqliteRow) -> Result<Contact> {
    Ok(Contact {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        subject: row.get("subject"),
        message: row.get("message"),
        created_at: from_db(&row.get::<String, _>("created_at"))?,
    })
}

pub async fn insert_contact(pool: &SqlitePool, contact: &NewContact) -> Result<Contact> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO contacts (id, name, email, subject, message, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&contact.name)
    .bind(&contact.email)
    .bind(&contact.subject)
    .bind(&contact.message)
    .bind(to_db(now()))
    .execute(pool)
    .await?;

    find_contact(pool, &id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Contact {} vanished after insert", id)))
}

pub async fn find_contact(pool: &SqlitePool, id: &str) -> Result<Option<Contact>> {
    let sql = format!("SELECT {} FROM contacts WHERE id = ?", CONTACT_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(contact_from_row).transpose()
}

pub async fn count_contacts(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM contacts")
        .fetch_one(pool)
        .await?)
}

/// One page of messages, newest first
pub async fn list_contacts(pool: &SqlitePool, pagination: &Pagination) -> Result<Vec<Contact>> {
    let sql = format!(
        "SELECT {} FROM contacts ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
        CONTACT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(cca_common::pagination::PAGE_SIZE)
        .bind(pagination.offset)
        .fetch_all(pool)
        .await?;
    rows.iter().map(contact_from_row).collect()
}
