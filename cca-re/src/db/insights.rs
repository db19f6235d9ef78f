//! Stored AI insights, one blob per user

use cca_common::time::{from_db, now, to_db};
use cca_common::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredInsights {
    pub user_id: String,
    pub insights: Value,
    pub model: String,
    pub job_id: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Replace the user's insights
pub async fn save_insights(
    pool: &SqlitePool,
    user_id: &str,
    insights: &Value,
    model: &str,
    job_id: Option<&str>,
) -> Result<StoredInsights> {
    let generated_at = now();
    sqlx::query(
        "INSERT INTO ai_insights (user_id, insights, model, job_id, generated_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(user_id) DO UPDATE SET
             insights = excluded.insights,
             model = excluded.model,
             job_id = excluded.job_id,
             generated_at = excluded.generated_at",
    )
    .bind(user_id)
    .bind(serde_json::to_string(insights)?)
    .bind(model)
    .bind(job_id)
    .bind(to_db(generated_at))
    .execute(pool)
    .await?;

    Ok(StoredInsights {
        user_id: user_id.to_string(),
        insights: insights.clone(),
        model: model.to_string(),
        job_id: job_id.map(str::to_string),
        generated_at,
    })
}

pub async fn find_insights(pool: &SqlitePool, user_id: &str) -> Result<Option<StoredInsights>> {
    let Some(row) = sqlx::query(
        "SELECT user_id, insights, model, job_id, generated_at FROM ai_insights WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    Ok(Some(StoredInsights {
        user_id: row.get("user_id"),
        insights: serde_json::from_str(&row.get::<String, _>("insights"))?,
        model: row.get("model"),
        job_id: row.get("job_id"),
        generated_at: from_db(&row.get::<String, _>("generated_at"))?,
    }))
}
