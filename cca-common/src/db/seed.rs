//! Assessment catalog seed
//!
//! The question bank ships inside the binary as TOML. Seeding is idempotent:
//! tests, dimensions and interpretations are inserted with `OR IGNORE`, and
//! questions are only written for a test that has none yet, so question and
//! option IDs stay stable once issued.

use crate::catalog::TestKind;
use crate::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

const QUESTION_BANK: &str = include_str!("question_bank.toml");

/// Answer labels for five-point agreement items, scored 1..=5
pub const LIKERT_LABELS: [&str; 5] = [
    "Strongly disagree",
    "Disagree",
    "Neutral",
    "Agree",
    "Strongly agree",
];

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionBank {
    pub tests: Vec<TestSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestSeed {
    pub id: i64,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_estimated_minutes")]
    pub estimated_minutes: i64,
    #[serde(default)]
    pub dimensions: Vec<DimensionSeed>,
    #[serde(default)]
    pub sections: Vec<SectionSeed>,
    #[serde(default)]
    pub results: Vec<ResultSeed>,
}

fn default_estimated_minutes() -> i64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct DimensionSeed {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionSeed {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<QuestionSeed>,
}

/// A question either lists its options or names a dimension for a
/// five-point agreement scale (`likert = "O"`)
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionSeed {
    pub text: String,
    #[serde(default)]
    pub reverse_scored: bool,
    #[serde(default)]
    pub likert: Option<String>,
    #[serde(default)]
    pub options: Vec<OptionSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionSeed {
    pub text: String,
    pub dimension: String,
    pub score: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultSeed {
    pub code: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub careers: Vec<String>,
}

impl QuestionSeed {
    /// Options as stored, expanding the agreement-scale shorthand
    pub fn expanded_options(&self) -> Vec<OptionSeed> {
        match &self.likert {
            Some(dimension) => LIKERT_LABELS
                .iter()
                .enumerate()
                .map(|(i, label)| OptionSeed {
                    text: (*label).to_string(),
                    dimension: dimension.clone(),
                    score: (i + 1) as f64,
                })
                .collect(),
            None => self.options.clone(),
        }
    }
}

/// Parse and validate the embedded question bank
pub fn question_bank() -> Result<QuestionBank> {
    let bank: QuestionBank = toml::from_str(QUESTION_BANK)
        .map_err(|e| Error::Config(format!("Invalid question bank: {}", e)))?;
    validate(&bank)?;
    Ok(bank)
}

fn validate(bank: &QuestionBank) -> Result<()> {
    for test in &bank.tests {
        let kind = TestKind::from_id(test.id)
            .ok_or_else(|| Error::Config(format!("Unknown test id {}", test.id)))?;
        if kind.code() != test.code {
            return Err(Error::Config(format!(
                "Test {} has code {}, expected {}",
                test.id,
                test.code,
                kind.code()
            )));
        }

        let known = kind.dimension_codes();
        for dimension in &test.dimensions {
            if !known.contains(&dimension.code.as_str()) {
                return Err(Error::Config(format!(
                    "{}: unknown dimension {}",
                    test.code, dimension.code
                )));
            }
        }

        for section in &test.sections {
            for question in &section.questions {
                let options = question.expanded_options();
                if options.len() < 2 {
                    return Err(Error::Config(format!(
                        "{}: question '{}' needs at least two options",
                        test.code, question.text
                    )));
                }
                if let Some(bad) = options
                    .iter()
                    .find(|o| !known.contains(&o.dimension.as_str()))
                {
                    return Err(Error::Config(format!(
                        "{}: option '{}' scores unknown dimension {}",
                        test.code, bad.text, bad.dimension
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Write the embedded catalog into the database
pub async fn seed_catalog(pool: &SqlitePool) -> Result<()> {
    let bank = question_bank()?;
    let mut seeded_questions = 0usize;

    for test in &bank.tests {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT OR IGNORE INTO tests (id, code, name, description, estimated_minutes, display_order)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(test.id)
        .bind(&test.code)
        .bind(&test.name)
        .bind(&test.description)
        .bind(test.estimated_minutes)
        .bind(test.id)
        .execute(&mut *tx)
        .await?;

        for dimension in &test.dimensions {
            sqlx::query(
                "INSERT OR IGNORE INTO test_dimensions (test_id, code, name, description)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(test.id)
            .bind(&dimension.code)
            .bind(&dimension.name)
            .bind(&dimension.description)
            .execute(&mut *tx)
            .await?;
        }

        for result in &test.results {
            sqlx::query(
                "INSERT OR IGNORE INTO test_result_configurations
                 (test_id, result_code, title, description, strengths, career_suggestions)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(test.id)
            .bind(&result.code)
            .bind(&result.title)
            .bind(&result.description)
            .bind(serde_json::to_string(&result.strengths)?)
            .bind(serde_json::to_string(&result.careers)?)
            .execute(&mut *tx)
            .await?;
        }

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE test_id = ?")
            .bind(test.id)
            .fetch_one(&mut *tx)
            .await?;

        if existing == 0 {
            let mut question_order = 0i64;
            for (section_index, section) in test.sections.iter().enumerate() {
                let section_id = sqlx::query(
                    "INSERT INTO test_sections (test_id, title, description, display_order)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(test.id)
                .bind(&section.title)
                .bind(&section.description)
                .bind(section_index as i64 + 1)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();

                for question in &section.questions {
                    question_order += 1;
                    let question_id = sqlx::query(
                        "INSERT INTO questions (test_id, section_id, text, display_order, reverse_scored)
                         VALUES (?, ?, ?, ?, ?)",
                    )
                    .bind(test.id)
                    .bind(section_id)
                    .bind(&question.text)
                    .bind(question_order)
                    .bind(question.reverse_scored as i64)
                    .execute(&mut *tx)
                    .await?
                    .last_insert_rowid();

                    for (option_index, option) in question.expanded_options().iter().enumerate() {
                        sqlx::query(
                            "INSERT INTO options (question_id, text, dimension_code, score, display_order)
                             VALUES (?, ?, ?, ?, ?)",
                        )
                        .bind(question_id)
                        .bind(&option.text)
                        .bind(&option.dimension)
                        .bind(option.score)
                        .bind(option_index as i64 + 1)
                        .execute(&mut *tx)
                        .await?;
                    }
                }
            }
            seeded_questions += question_order as usize;
            debug!(test = %test.code, questions = question_order, "Seeded questions");
        }

        tx.commit().await?;
    }

    if seeded_questions > 0 {
        info!(
            tests = bank.tests.len(),
            questions = seeded_questions,
            "Seeded assessment catalog"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_bank_is_valid() {
        let bank = question_bank().unwrap();
        assert_eq!(bank.tests.len(), TestKind::ALL.len());
        for (seed, kind) in bank.tests.iter().zip(TestKind::ALL) {
            assert_eq!(seed.id, kind.id());
            assert!(!seed.sections.is_empty(), "{} has no questions", seed.code);
            assert!(!seed.results.is_empty(), "{} has no interpretations", seed.code);
        }
    }

    #[test]
    fn test_every_dimension_is_described() {
        let bank = question_bank().unwrap();
        for seed in &bank.tests {
            let kind = TestKind::from_id(seed.id).unwrap();
            let described: Vec<&str> = seed.dimensions.iter().map(|d| d.code.as_str()).collect();
            assert_eq!(described, kind.dimension_codes(), "{}", seed.code);
        }
    }

    #[test]
    fn test_likert_expansion() {
        let question = QuestionSeed {
            text: "I enjoy abstract ideas".to_string(),
            reverse_scored: false,
            likert: Some("O".to_string()),
            options: Vec::new(),
        };
        let options = question.expanded_options();
        assert_eq!(options.len(), 5);
        assert!(options.iter().all(|o| o.dimension == "O"));
        assert_eq!(options[0].score, 1.0);
        assert_eq!(options[4].score, 5.0);
    }

    #[test]
    fn test_mismatched_code_rejected() {
        let bank = QuestionBank {
            tests: vec![TestSeed {
                id: 1,
                code: "DISC".to_string(),
                name: "x".to_string(),
                description: String::new(),
                estimated_minutes: 5,
                dimensions: Vec::new(),
                sections: Vec::new(),
                results: Vec::new(),
            }],
        };
        assert!(matches!(validate(&bank), Err(Error::Config(_))));
    }
}
