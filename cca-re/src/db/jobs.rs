//! Background job rows
//!
//! State changes are conditional updates on the expected current state, so
//! two runners can never both move the same job.

use cca_common::events::{JobKind, JobState};
use cca_common::time::{from_db, from_db_opt, now, to_db};
use cca_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub user_id: String,
    pub kind: JobKind,
    pub state: JobState,
    pub attempts: u32,
    pub max_retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

const JOB_COLUMNS: &str = "id, user_id, kind, state, attempts, max_retries, payload, result, error, \
                           created_at, updated_at, started_at, finished_at";

fn json_column(value: Option<String>) -> Result<Option<Value>> {
    value
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(Error::from)
}

fn job_from_row(row: &SqliteRow) -> Result<Job> {
    let kind: String = row.get("kind");
    let state: String = row.get("state");
    Ok(Job {
        id: row.get("id"),
        user_id: row.get("user_id"),
        kind: JobKind::parse(&kind)
            .ok_or_else(|| Error::Internal(format!("Unknown job kind '{}'", kind)))?,
        state: JobState::parse(&state)
            .ok_or_else(|| Error::Internal(format!("Unknown job state '{}'", state)))?,
        attempts: row.get::<i64, _>("attempts") as u32,
        max_retries: row.get::<i64, _>("max_retries") as u32,
        payload: json_column(row.get("payload"))?,
        result: json_column(row.get("result"))?,
        error: row.get("error"),
        created_at: from_db(&row.get::<String, _>("created_at"))?,
        updated_at: from_db(&row.get::<String, _>("updated_at"))?,
        started_at: from_db_opt(row.get("started_at"))?,
        finished_at: from_db_opt(row.get("finished_at"))?,
    })
}

/// Deduplication key: one unfinished job per user and key
///
/// Report renders are keyed by their requested format.
pub fn dedup_key(kind: JobKind, payload: Option<&Value>) -> String {
    match payload.and_then(|p| p.get("format")).and_then(Value::as_str) {
        Some(format) if kind == JobKind::ReportRender => format!("{}:{}", kind, format),
        _ => kind.as_str().to_string(),
    }
}

/// Insert a queued job
///
/// Fails with a unique violation while an unfinished job with the same
/// dedup key exists for the user.
pub async fn insert_job(
    pool: &SqlitePool,
    user_id: &str,
    kind: JobKind,
    max_retries: u32,
    payload: Option<&Value>,
) -> Result<Job> {
    let id = Uuid::new_v4().to_string();
    let ts = to_db(now());

    sqlx::query(
        "INSERT INTO jobs (id, user_id, kind, dedup_key, state, attempts, max_retries, payload,
                           created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(user_id)
    .bind(kind.as_str())
    .bind(dedup_key(kind, payload))
    .bind(JobState::Queued.as_str())
    .bind(max_retries as i64)
    .bind(payload.map(serde_json::to_string).transpose()?)
    .bind(&ts)
    .bind(&ts)
    .execute(pool)
    .await?;

    get_job(pool, &id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Job {} vanished after insert", id)))
}

pub async fn get_job(pool: &SqlitePool, job_id: &str) -> Result<Option<Job>> {
    let sql = format!("SELECT {} FROM jobs WHERE id = ?", JOB_COLUMNS);
    let row = sqlx::query(&sql).bind(job_id).fetch_optional(pool).await?;
    row.as_ref().map(job_from_row).transpose()
}

/// A user's jobs, newest first
pub async fn list_jobs(pool: &SqlitePool, user_id: &str) -> Result<Vec<Job>> {
    let sql = format!(
        "SELECT {} FROM jobs WHERE user_id = ? ORDER BY created_at DESC",
        JOB_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(user_id).fetch_all(pool).await?;
    rows.iter().map(job_from_row).collect()
}

/// The user's unfinished job with this dedup key, if any
pub async fn find_active(pool: &SqlitePool, user_id: &str, key: &str) -> Result<Option<Job>> {
    let sql = format!(
        "SELECT {} FROM jobs WHERE user_id = ? AND dedup_key = ? AND state IN (?, ?, ?)
         ORDER BY created_at DESC LIMIT 1",
        JOB_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(key)
        .bind(JobState::Queued.as_str())
        .bind(JobState::Running.as_str())
        .bind(JobState::Retrying.as_str())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(job_from_row).transpose()
}

/// Every job that has not reached a terminal state, oldest first
pub async fn list_unfinished(pool: &SqlitePool) -> Result<Vec<Job>> {
    let sql = format!(
        "SELECT {} FROM jobs WHERE state IN (?, ?, ?) ORDER BY created_at",
        JOB_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(JobState::Queued.as_str())
        .bind(JobState::Running.as_str())
        .bind(JobState::Retrying.as_str())
        .fetch_all(pool)
        .await?;
    rows.iter().map(job_from_row).collect()
}

/// Start an attempt: `Queued | Retrying -> Running`, counting the attempt
///
/// `None` when the job was not in a startable state.
pub async fn start_attempt(pool: &SqlitePool, job_id: &str) -> Result<Option<Job>> {
    let ts = to_db(now());
    let updated = sqlx::query(
        "UPDATE jobs SET state = ?, attempts = attempts + 1, updated_at = ?,
                         started_at = COALESCE(started_at, ?)
         WHERE id = ? AND state IN (?, ?)",
    )
    .bind(JobState::Running.as_str())
    .bind(&ts)
    .bind(&ts)
    .bind(job_id)
    .bind(JobState::Queued.as_str())
    .bind(JobState::Retrying.as_str())
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Ok(None);
    }
    get_job(pool, job_id).await
}

/// Leave `Running` for `next`, recording the outcome
///
/// Returns false when the job was no longer running.
pub async fn finish_attempt(
    pool: &SqlitePool,
    job_id: &str,
    next: JobState,
    result: Option<&Value>,
    error: Option<&str>,
) -> Result<bool> {
    if !JobState::Running.can_transition_to(next) {
        return Err(Error::InvalidInput(format!(
            "Illegal job transition RUNNING -> {}",
            next
        )));
    }

    let ts = to_db(now());
    let finished_at = next.is_terminal().then(|| ts.clone());
    let updated = sqlx::query(
        "UPDATE jobs SET state = ?, result = COALESCE(?, result), error = ?, updated_at = ?,
                         finished_at = ?
         WHERE id = ? AND state = ?",
    )
    .bind(next.as_str())
    .bind(result.map(serde_json::to_string).transpose()?)
    .bind(error)
    .bind(&ts)
    .bind(finished_at)
    .bind(job_id)
    .bind(JobState::Running.as_str())
    .execute(pool)
    .await?
    .rows_affected();

    Ok(updated > 0)
}

/// Force an unfinished job to `Failed`
///
/// Used when the runner itself errors and the job would otherwise stay
/// unfinished with nobody driving it. `None` when the job had already
/// reached a terminal state.
pub async fn abandon(pool: &SqlitePool, job_id: &str, error: &str) -> Result<Option<Job>> {
    let ts = to_db(now());
    let updated = sqlx::query(
        "UPDATE jobs SET state = ?, error = ?, updated_at = ?, finished_at = ?
         WHERE id = ? AND state IN (?, ?, ?)",
    )
    .bind(JobState::Failed.as_str())
    .bind(error)
    .bind(&ts)
    .bind(&ts)
    .bind(job_id)
    .bind(JobState::Queued.as_str())
    .bind(JobState::Running.as_str())
    .bind(JobState::Retrying.as_str())
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Ok(None);
    }
    get_job(pool, job_id).await
}

/// Return interrupted attempts to the queue after a restart
///
/// Jobs left `Running` by a previous process become `Retrying`.
pub async fn recover_interrupted(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE jobs SET state = ?, error = 'Interrupted by restart', updated_at = ?
         WHERE state = ?",
    )
    .bind(JobState::Retrying.as_str())
    .bind(to_db(now()))
    .bind(JobState::Running.as_str())
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
