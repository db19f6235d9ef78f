//! Catalog queries
//!
//! Read-only access to tests, sections, dimensions, questions and result
//! interpretations. Used by the question service for display and by the
//! result service for scoring.

use super::models::{
    AnswerOption, Question, ResultConfiguration, Test, TestDimension, TestSection,
};
use crate::catalog::TestKind;
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

const TEST_COLUMNS: &str = r#"
    t.id, t.code, t.name, t.description, t.estimated_minutes, t.display_order, t.is_active,
    (SELECT COUNT(*) FROM questions q WHERE q.test_id = t.id) AS question_count
"#;

fn test_from_row(row: &SqliteRow) -> Test {
    Test {
        id: row.get("id"),
        code: row.get("code"),
        name: row.get("name"),
        description: row.get("description"),
        estimated_minutes: row.get("estimated_minutes"),
        display_order: row.get("display_order"),
        is_active: row.get::<i64, _>("is_active") != 0,
        question_count: row.get("question_count"),
    }
}

/// Tests in display order
pub async fn list_tests(pool: &SqlitePool, active_only: bool) -> Result<Vec<Test>> {
    let sql = format!(
        "SELECT {} FROM tests t {} ORDER BY t.display_order, t.id",
        TEST_COLUMNS,
        if active_only { "WHERE t.is_active = 1" } else { "" }
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    Ok(rows.iter().map(test_from_row).collect())
}

pub async fn get_test(pool: &SqlitePool, test_id: i64) -> Result<Option<Test>> {
    let sql = format!("SELECT {} FROM tests t WHERE t.id = ?", TEST_COLUMNS);
    let row = sqlx::query(&sql).bind(test_id).fetch_optional(pool).await?;
    Ok(row.as_ref().map(test_from_row))
}

pub async fn list_sections(pool: &SqlitePool, test_id: i64) -> Result<Vec<TestSection>> {
    let rows = sqlx::query(
        "SELECT id, test_id, title, description, display_order
         FROM test_sections WHERE test_id = ? ORDER BY display_order",
    )
    .bind(test_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| TestSection {
            id: row.get("id"),
            test_id: row.get("test_id"),
            title: row.get("title"),
            description: row.get("description"),
            display_order: row.get("display_order"),
        })
        .collect())
}

pub async fn list_dimensions(pool: &SqlitePool, test_id: i64) -> Result<Vec<TestDimension>> {
    let rows = sqlx::query(
        "SELECT id, test_id, code, name, description
         FROM test_dimensions WHERE test_id = ? ORDER BY id",
    )
    .bind(test_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| TestDimension {
            id: row.get("id"),
            test_id: row.get("test_id"),
            code: row.get("code"),
            name: row.get("name"),
            description: row.get("description"),
        })
        .collect())
}

fn option_from_row(row: &SqliteRow) -> AnswerOption {
    AnswerOption {
        id: row.get("id"),
        question_id: row.get("question_id"),
        text: row.get("text"),
        dimension_code: row.get("dimension_code"),
        score: row.get("score"),
        display_order: row.get("display_order"),
    }
}

fn question_from_row(row: &SqliteRow) -> Question {
    Question {
        id: row.get("id"),
        test_id: row.get("test_id"),
        section_id: row.get("section_id"),
        text: row.get("text"),
        display_order: row.get("display_order"),
        reverse_scored: row.get::<i64, _>("reverse_scored") != 0,
        options: Vec::new(),
    }
}

/// Every question of a test with its options, both in display order
pub async fn load_questions(pool: &SqlitePool, test_id: i64) -> Result<Vec<Question>> {
    let question_rows = sqlx::query(
        "SELECT id, test_id, section_id, text, display_order, reverse_scored
         FROM questions WHERE test_id = ? ORDER BY display_order",
    )
    .bind(test_id)
    .fetch_all(pool)
    .await?;

    let option_rows = sqlx::query(
        "SELECT o.id, o.question_id, o.text, o.dimension_code, o.score, o.display_order
         FROM options o JOIN questions q ON q.id = o.question_id
         WHERE q.test_id = ? ORDER BY o.question_id, o.display_order",
    )
    .bind(test_id)
    .fetch_all(pool)
    .await?;

    let mut options_by_question: HashMap<i64, Vec<AnswerOption>> = HashMap::new();
    for row in &option_rows {
        let option = option_from_row(row);
        options_by_question
            .entry(option.question_id)
            .or_default()
            .push(option);
    }

    Ok(question_rows
        .iter()
        .map(|row| {
            let mut question = question_from_row(row);
            question.options = options_by_question.remove(&question.id).unwrap_or_default();
            question
        })
        .collect())
}

pub async fn get_question(pool: &SqlitePool, question_id: i64) -> Result<Option<Question>> {
    let Some(row) = sqlx::query(
        "SELECT id, test_id, section_id, text, display_order, reverse_scored
         FROM questions WHERE id = ?",
    )
    .bind(question_id)
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    let mut question = question_from_row(&row);
    let option_rows = sqlx::query(
        "SELECT id, question_id, text, dimension_code, score, display_order
         FROM options WHERE question_id = ? ORDER BY display_order",
    )
    .bind(question_id)
    .fetch_all(pool)
    .await?;
    question.options = option_rows.iter().map(option_from_row).collect();

    Ok(Some(question))
}

/// Interpretation for a result code, trying the exact code then its
/// broader fallbacks (e.g. `4w5` then `4`)
pub async fn get_result_configuration(
    pool: &SqlitePool,
    test_id: i64,
    result_code: &str,
) -> Result<Option<ResultConfiguration>> {
    let candidates = match TestKind::from_id(test_id) {
        Some(kind) => kind.interpretation_keys(result_code),
        None => vec![result_code.to_string()],
    };

    for code in candidates {
        let row = sqlx::query(
            "SELECT test_id, result_code, title, description, strengths, career_suggestions
             FROM test_result_configurations WHERE test_id = ? AND result_code = ?",
        )
        .bind(test_id)
        .bind(&code)
        .fetch_optional(pool)
        .await?;

        if let Some(row) = row {
            let strengths: String = row.get("strengths");
            let careers: String = row.get("career_suggestions");
            return Ok(Some(ResultConfiguration {
                test_id: row.get("test_id"),
                result_code: row.get("result_code"),
                title: row.get("title"),
                description: row.get("description"),
                strengths: serde_json::from_str(&strengths)?,
                career_suggestions: serde_json::from_str(&careers)?,
            }));
        }
    }

    Ok(None)
}
