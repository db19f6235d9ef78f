//! Completion status across the required tests

use crate::db::results;
use cca_common::cache::{keys, CacheProvider};
use cca_common::catalog::TestKind;
use cca_common::db::settings;
use cca_common::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCompletion {
    pub test_id: i64,
    pub code: String,
    pub name: String,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionStatus {
    pub user_id: String,
    pub tests: Vec<TestCompletion>,
    pub completed_count: usize,
    pub total: usize,
    /// `completed_count / total * 100`, one decimal
    pub percentage: f64,
    pub all_completed: bool,
    /// First incomplete test in catalog order
    pub next_test: Option<TestCompletion>,
}

/// Build the status from the completion times of finished tests
pub fn summarize(user_id: &str, completed: &HashMap<i64, DateTime<Utc>>) -> CompletionStatus {
    let tests: Vec<TestCompletion> = TestKind::ALL
        .iter()
        .map(|kind| {
            let completed_at = completed.get(&kind.id()).copied();
            TestCompletion {
                test_id: kind.id(),
                code: kind.code().to_string(),
                name: kind.display_name().to_string(),
                completed: completed_at.is_some(),
                completed_at,
            }
        })
        .collect();

    let total = tests.len();
    let completed_count = tests.iter().filter(|t| t.completed).count();
    let percentage = if total == 0 {
        0.0
    } else {
        crate::scoring::round1(completed_count as f64 / total as f64 * 100.0)
    };
    let next_test = tests.iter().find(|t| !t.completed).cloned();

    CompletionStatus {
        user_id: user_id.to_string(),
        completed_count,
        total,
        percentage,
        all_completed: completed_count == total,
        next_test,
        tests,
    }
}

/// Cache-aside completion status
pub async fn completion_status(
    pool: &SqlitePool,
    cache: &CacheProvider,
    user_id: &str,
) -> Result<CompletionStatus> {
    let ttl = settings::completion_cache_ttl(pool).await?;
    cache
        .get_or_load(&keys::completion(user_id), ttl, || async {
            let completed: HashMap<i64, DateTime<Utc>> =
                results::completed_tests(pool, user_id).await?.into_iter().collect();
            Ok::<_, cca_common::Error>(summarize(user_id, &completed))
        })
        .await
}

/// Drop the cached status after the user's results change
pub async fn invalidate(cache: &CacheProvider, user_id: &str) {
    cache.invalidate(&[keys::completion(user_id)]).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_completed() {
        let status = summarize("u1", &HashMap::new());
        assert_eq!(status.total, 7);
        assert_eq!(status.completed_count, 0);
        assert_eq!(status.percentage, 0.0);
        assert!(!status.all_completed);
        assert_eq!(status.next_test.unwrap().code, "MBTI");
    }

    #[test]
    fn test_partial_completion() {
        let at = Utc::now();
        let completed = HashMap::from([(1, at), (2, at), (4, at)]);
        let status = summarize("u1", &completed);
        assert_eq!(status.completed_count, 3);
        assert_eq!(status.percentage, 42.9);
        assert_eq!(status.next_test.as_ref().map(|t| t.test_id), Some(3));
        assert_eq!(status.tests[3].completed_at, Some(at));
    }

    #[test]
    fn test_all_completed() {
        let at = Utc::now();
        let completed: HashMap<i64, DateTime<Utc>> =
            TestKind::ALL.iter().map(|k| (k.id(), at)).collect();
        let status = summarize("u1", &completed);
        assert!(status.all_completed);
        assert_eq!(status.percentage, 100.0);
        assert!(status.next_test.is_none());
    }

    #[test]
    fn test_unknown_test_ids_ignored() {
        let completed = HashMap::from([(99, Utc::now())]);
        let status = summarize("u1", &completed);
        assert_eq!(status.completed_count, 0);
    }
}
