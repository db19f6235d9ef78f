//! Stored test results
//!
//! One row per (user, test); a retake overwrites the previous answers and
//! scores in place.

use crate::scoring::{Answer, ScoringOutcome};
use cca_common::time::{from_db, from_db_opt, now, to_db};
use cca_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: String,
    pub user_id: String,
    pub test_id: i64,
    pub answers: Vec<Answer>,
    pub scores: ScoringOutcome,
    pub result_code: String,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const RESULT_COLUMNS: &str = "id, user_id, test_id, answers, scores, result_code, is_completed, \
                              completed_at, created_at, updated_at";

fn result_from_row(row: &SqliteRow) -> Result<TestResult> {
    Ok(TestResult {
        id: row.get("id"),
        user_id: row.get("user_id"),
        test_id: row.get("test_id"),
        answers: serde_json::from_str(&row.get::<String, _>("answers"))?,
        scores: serde_json::from_str(&row.get::<String, _>("scores"))?,
        result_code: row.get("result_code"),
        is_completed: row.get::<i64, _>("is_completed") != 0,
        completed_at: from_db_opt(row.get("completed_at"))?,
        created_at: from_db(&row.get::<String, _>("created_at"))?,
        updated_at: from_db(&row.get::<String, _>("updated_at"))?,
    })
}

/// Insert or replace the user's result for a test
pub async fn upsert_result(
    pool: &SqlitePool,
    user_id: &str,
    test_id: i64,
    answers: &[Answer],
    outcome: &ScoringOutcome,
) -> Result<TestResult> {
    let ts = to_db(now());
    let completed_at = outcome.is_completed.then(|| ts.clone());

    sqlx::query(
        r#"
        INSERT INTO test_results
            (id, user_id, test_id, answers, scores, result_code, is_completed, completed_at,
             created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id, test_id) DO UPDATE SET
            answers = excluded.answers,
            scores = excluded.scores,
            result_code = excluded.result_code,
            is_completed = excluded.is_completed,
            completed_at = excluded.completed_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(test_id)
    .bind(serde_json::to_string(answers)?)
    .bind(serde_json::to_string(outcome)?)
    .bind(&outcome.result_code)
    .bind(outcome.is_completed as i64)
    .bind(completed_at)
    .bind(&ts)
    .bind(&ts)
    .execute(pool)
    .await?;

    find_result(pool, user_id, test_id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Result for test {} vanished after upsert", test_id)))
}

pub async fn find_result(pool: &SqlitePool, user_id: &str, test_id: i64) -> Result<Option<TestResult>> {
    let sql = format!(
        "SELECT {} FROM test_results WHERE user_id = ? AND test_id = ?",
        RESULT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(test_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(result_from_row).transpose()
}

/// All results of a user, in catalog order
pub async fn list_results(pool: &SqlitePool, user_id: &str) -> Result<Vec<TestResult>> {
    let sql = format!(
        "SELECT {} FROM test_results WHERE user_id = ? ORDER BY test_id",
        RESULT_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(user_id).fetch_all(pool).await?;
    rows.iter().map(result_from_row).collect()
}

/// Completion timestamps of the user's completed tests
pub async fn completed_tests(pool: &SqlitePool, user_id: &str) -> Result<Vec<(i64, DateTime<Utc>)>> {
    let rows = sqlx::query(
        "SELECT test_id, completed_at FROM test_results
         WHERE user_id = ? AND is_completed = 1 AND completed_at IS NOT NULL",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| Ok((row.get("test_id"), from_db(&row.get::<String, _>("completed_at"))?)))
        .collect()
}

/// Remove a result; false when there was none
pub async fn delete_result(pool: &SqlitePool, user_id: &str, test_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM test_results WHERE user_id = ? AND test_id = ?")
        .bind(user_id)
        .bind(test_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
