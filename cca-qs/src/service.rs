//! Cached catalog reads
//!
//! Inactive tests are invisible here: detail and questions answer 404 for
//! them, exactly as for unknown IDs.

use cca_common::api::{ApiError, ApiResult};
use cca_common::cache::{keys, CacheProvider};
use cca_common::db::catalog;
use cca_common::db::settings;
use cca_common::db::{Question, Test, TestDimension, TestSection};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// A test with the structure shown before the first question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDetail {
    #[serde(flatten)]
    pub test: Test,
    pub sections: Vec<TestSection>,
    pub dimensions: Vec<TestDimension>,
}

/// Questions of one section; `section` is `None` for questions outside any
/// section
#[derive(Debug, Clone, Serialize)]
pub struct SectionGroup {
    pub section: Option<TestSection>,
    pub questions: Vec<Question>,
}

pub async fn list_active_tests(pool: &SqlitePool, cache: &CacheProvider) -> ApiResult<Vec<Test>> {
    let ttl = settings::questions_cache_ttl(pool).await?;
    cache
        .get_or_load(&keys::tests_list(), ttl, || async {
            catalog::list_tests(pool, true).await.map_err(ApiError::from)
        })
        .await
}

async fn active_test(pool: &SqlitePool, test_id: i64) -> ApiResult<Test> {
    catalog::get_test(pool, test_id)
        .await?
        .filter(|t| t.is_active)
        .ok_or_else(|| ApiError::NotFound(format!("Test not found: {}", test_id)))
}

pub async fn test_detail(
    pool: &SqlitePool,
    cache: &CacheProvider,
    test_id: i64,
) -> ApiResult<TestDetail> {
    let ttl = settings::questions_cache_ttl(pool).await?;
    cache
        .get_or_load(&keys::test_detail(test_id), ttl, || async {
            let test = active_test(pool, test_id).await?;
            Ok::<_, ApiError>(TestDetail {
                test,
                sections: catalog::list_sections(pool, test_id).await?,
                dimensions: catalog::list_dimensions(pool, test_id).await?,
            })
        })
        .await
}

/// Ordered questions with their options
pub async fn test_questions(
    pool: &SqlitePool,
    cache: &CacheProvider,
    test_id: i64,
) -> ApiResult<Vec<Question>> {
    let ttl = settings::questions_cache_ttl(pool).await?;
    cache
        .get_or_load(&keys::test_questions(test_id), ttl, || async {
            active_test(pool, test_id).await?;
            Ok::<_, ApiError>(catalog::load_questions(pool, test_id).await?)
        })
        .await
}

/// Bucket questions under their sections, in section order
///
/// Questions keep their relative order. Unsectioned questions, if any, form
/// a trailing group.
pub fn group_by_section(sections: &[TestSection], questions: Vec<Question>) -> Vec<SectionGroup> {
    let mut groups: Vec<SectionGroup> = sections
        .iter()
        .map(|s| SectionGroup {
            section: Some(s.clone()),
            questions: Vec::new(),
        })
        .collect();
    let mut loose = Vec::new();

    for question in questions {
        let slot = question
            .section_id
            .and_then(|id| sections.iter().position(|s| s.id == id));
        match slot {
            Some(index) => groups[index].questions.push(question),
            None => loose.push(question),
        }
    }

    if !loose.is_empty() {
        groups.push(SectionGroup {
            section: None,
            questions: loose,
        });
    }
    groups
}

/// A single question; questions of inactive tests are hidden
pub async fn question(pool: &SqlitePool, question_id: i64) -> ApiResult<Question> {
    let not_found = || ApiError::NotFound(format!("Question not found: {}", question_id));
    let question = catalog::get_question(pool, question_id).await?.ok_or_else(not_found)?;
    active_test(pool, question.test_id).await.map_err(|e| match e {
        ApiError::NotFound(_) => not_found(),
        other => other,
    })?;
    Ok(question)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: i64) -> TestSection {
        TestSection {
            id,
            test_id: 1,
            title: format!("Section {}", id),
            description: String::new(),
            display_order: id,
        }
    }

    fn question(id: i64, section_id: Option<i64>) -> Question {
        Question {
            id,
            test_id: 1,
            section_id,
            text: format!("Q{}", id),
            display_order: id,
            reverse_scored: false,
            options: Vec::new(),
        }
    }

    #[test]
    fn test_group_by_section_keeps_order() {
        let sections = vec![section(10), section(20)];
        let questions = vec![
            question(1, Some(10)),
            question(2, Some(20)),
            question(3, Some(10)),
            question(4, None),
        ];

        let groups = group_by_section(&sections, questions);
        assert_eq!(groups.len(), 3);
        let ids: Vec<Vec<i64>> = groups
            .iter()
            .map(|g| g.questions.iter().map(|q| q.id).collect())
            .collect();
        assert_eq!(ids, vec![vec![1, 3], vec![2], vec![4]]);
        assert!(groups[2].section.is_none());
    }

    #[test]
    fn test_group_by_section_without_loose_questions() {
        let groups = group_by_section(&[section(1)], vec![question(1, Some(1))]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].section.as_ref().map(|s| s.id), Some(1));
    }
}
