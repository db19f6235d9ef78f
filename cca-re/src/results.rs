//! Submitting, reading and deleting test results

use crate::completion;
use crate::db::results::{self, TestResult};
use crate::db::users::{self, UserSummary};
use crate::scoring::{self, Answer};
use cca_common::api::{ApiError, ApiResult};
use cca_common::cache::{keys, CacheProvider};
use cca_common::catalog::TestKind;
use cca_common::db::{catalog, settings, Question, ResultConfiguration};
use cca_common::events::{CcaEvent, EventBus};
use cca_common::time::now;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

/// A stored result with the interpretation of its code
#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    #[serde(flatten)]
    pub result: TestResult,
    pub test_code: String,
    pub interpretation: Option<ResultConfiguration>,
}

pub async fn require_user(pool: &SqlitePool, user_id: &str) -> ApiResult<UserSummary> {
    users::find_user(pool, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User not found: {}", user_id)))
}

fn test_kind(test_id: i64) -> ApiResult<TestKind> {
    TestKind::from_id(test_id).ok_or_else(|| ApiError::NotFound(format!("Test not found: {}", test_id)))
}

/// Questions of an active test, shared with the question service's cache
async fn scoring_questions(
    pool: &SqlitePool,
    cache: &CacheProvider,
    test_id: i64,
) -> ApiResult<Vec<Question>> {
    let active = catalog::get_test(pool, test_id)
        .await?
        .is_some_and(|t| t.is_active);
    if !active {
        return Err(ApiError::NotFound(format!("Test not found: {}", test_id)));
    }

    let ttl = settings::questions_cache_ttl(pool).await?;
    cache
        .get_or_load(&keys::test_questions(test_id), ttl, || async {
            catalog::load_questions(pool, test_id).await.map_err(ApiError::from)
        })
        .await
}

async fn view(pool: &SqlitePool, kind: TestKind, result: TestResult) -> ApiResult<ResultView> {
    let interpretation =
        catalog::get_result_configuration(pool, result.test_id, &result.result_code).await?;
    Ok(ResultView {
        result,
        test_code: kind.code().to_string(),
        interpretation,
    })
}

/// Score answers and store them as the user's result for the test
///
/// A retake replaces the earlier result.
pub async fn submit(
    pool: &SqlitePool,
    cache: &CacheProvider,
    events: &EventBus,
    user_id: &str,
    test_id: i64,
    answers: &[Answer],
) -> ApiResult<ResultView> {
    let kind = test_kind(test_id)?;
    require_user(pool, user_id).await?;
    let questions = scoring_questions(pool, cache, test_id).await?;

    let outcome = scoring::score_test(kind, &questions, answers)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let result = results::upsert_result(pool, user_id, test_id, answers, &outcome).await?;

    completion::invalidate(cache, user_id).await;
    info!(
        user_id = %user_id,
        test = %kind,
        result_code = %result.result_code,
        is_completed = result.is_completed,
        "Test result stored"
    );
    events.emit_lossy(CcaEvent::ResultSubmitted {
        user_id: user_id.to_string(),
        test_id,
        result_code: result.result_code.clone(),
        is_completed: result.is_completed,
        timestamp: now(),
    });

    view(pool, kind, result).await
}

pub async fn list(pool: &SqlitePool, user_id: &str) -> ApiResult<Vec<TestResult>> {
    require_user(pool, user_id).await?;
    Ok(results::list_results(pool, user_id).await?)
}

pub async fn get(pool: &SqlitePool, user_id: &str, test_id: i64) -> ApiResult<ResultView> {
    let kind = test_kind(test_id)?;
    let result = results::find_result(pool, user_id, test_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No result for test {}", test_id)))?;
    view(pool, kind, result).await
}

/// Remove the user's result so the test can be retaken from scratch
pub async fn delete(
    pool: &SqlitePool,
    cache: &CacheProvider,
    events: &EventBus,
    user_id: &str,
    test_id: i64,
) -> ApiResult<()> {
    test_kind(test_id)?;
    if !results::delete_result(pool, user_id, test_id).await? {
        return Err(ApiError::NotFound(format!("No result for test {}", test_id)));
    }

    completion::invalidate(cache, user_id).await;
    info!(user_id = %user_id, test_id, "Test result deleted");
    events.emit_lossy(CcaEvent::ResultDeleted {
        user_id: user_id.to_string(),
        test_id,
        timestamp: now(),
    });
    Ok(())
}
