//! AI insight generation
//!
//! A generator turns a comprehensive report into a JSON blob. The result is
//! stored per user in `ai_insights` and cached.

mod llm;
mod prompt;

pub use llm::LlmInsightGenerator;
pub use prompt::{build_prompt, SYSTEM_PROMPT};

use crate::db::insights::{self as store, StoredInsights};
use crate::reports::ComprehensiveReport;
use async_trait::async_trait;
use cca_common::cache::{keys, CacheProvider};
use cca_common::db::settings;
use cca_common::Result;
use serde_json::Value;
use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("Insight generation is not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("LLM API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unusable LLM response: {0}")]
    InvalidResponse(String),
}

impl InsightError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            InsightError::NotConfigured(_) => false,
            InsightError::Network(_) | InsightError::InvalidResponse(_) => true,
            InsightError::Api { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

#[async_trait]
pub trait InsightGenerator: Send + Sync {
    /// Model name recorded with stored insights
    fn model(&self) -> &str;

    async fn generate(&self, report: &ComprehensiveReport) -> std::result::Result<Value, InsightError>;
}

/// Generator used when no API key is configured; every job fails at once
pub struct UnconfiguredGenerator;

#[async_trait]
impl InsightGenerator for UnconfiguredGenerator {
    fn model(&self) -> &str {
        "none"
    }

    async fn generate(&self, _report: &ComprehensiveReport) -> std::result::Result<Value, InsightError> {
        Err(InsightError::NotConfigured("no LLM API key".to_string()))
    }
}

/// Stored insights through the cache
///
/// Absence is not cached, so freshly generated insights show up at once.
pub async fn cached_insights(
    pool: &SqlitePool,
    cache: &CacheProvider,
    user_id: &str,
) -> Result<Option<StoredInsights>> {
    let key = keys::insights(user_id);
    if let Some(hit) = cache.get_json::<StoredInsights>(&key).await {
        return Ok(Some(hit));
    }

    let stored = store::find_insights(pool, user_id).await?;
    if let Some(insights) = &stored {
        let ttl = settings::insights_cache_ttl(pool).await?;
        cache.set_json_with_ttl(&key, insights, ttl).await;
    }
    Ok(stored)
}

/// Persist freshly generated insights and refresh the cache
pub async fn save_insights(
    pool: &SqlitePool,
    cache: &CacheProvider,
    user_id: &str,
    insights: &Value,
    model: &str,
    job_id: Option<&str>,
) -> Result<StoredInsights> {
    let stored = store::save_insights(pool, user_id, insights, model, job_id).await?;
    let ttl = settings::insights_cache_ttl(pool).await?;
    cache
        .set_json_with_ttl(&keys::insights(user_id), &stored, ttl)
        .await;
    Ok(stored)
}
