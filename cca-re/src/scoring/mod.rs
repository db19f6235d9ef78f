//! Test scoring
//!
//! Turns a user's answers into per-dimension scores and a result code.
//!
//! Each option scores one dimension. For every dimension a question touches,
//! an option scoring a different dimension counts as 0 toward it, so a
//! forced-choice question between `E` and `I` ranges 0..=1 on both.
//! Reverse-scored questions mirror the chosen score within the question's
//! own option range (`max + min - score`).

mod interpret;

pub use interpret::interpret;

use cca_common::catalog::TestKind;
use cca_common::db::Question;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// One answer: the option picked for a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: i64,
    pub option_id: i64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    #[error("No answers submitted")]
    NoAnswers,

    #[error("Question {0} does not belong to this test")]
    UnknownQuestion(i64),

    #[error("Option {option_id} is not an answer to question {question_id}")]
    UnknownOption { question_id: i64, option_id: i64 },

    #[error("Question {0} answered more than once")]
    DuplicateQuestion(i64),
}

/// Aggregated score for one dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub code: String,
    pub raw: f64,
    pub min: f64,
    pub max: f64,
    /// `(raw - min) / (max - min) * 100`, one decimal
    pub percentage: f64,
}

/// Relative share of one MBTI preference pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairShare {
    pub first: String,
    pub second: String,
    pub first_percentage: f64,
    pub second_percentage: f64,
    pub preferred: String,
}

/// Everything stored for a scored submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringOutcome {
    pub result_code: String,
    /// Every dimension of the test, in canonical order
    pub dimensions: Vec<DimensionScore>,
    /// Ranked dimension codes the interpretation highlights
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pairs: Vec<PairShare>,
    pub answered: usize,
    pub total_questions: usize,
    pub is_completed: bool,
}

impl ScoringOutcome {
    pub fn dimension(&self, code: &str) -> Option<&DimensionScore> {
        self.dimensions.iter().find(|d| d.code == code)
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Check every answer against the test's questions
///
/// Returns the chosen option index per answered question.
pub fn validate<'q>(
    questions: &'q [Question],
    answers: &[Answer],
) -> Result<Vec<(&'q Question, usize)>, ScoringError> {
    if answers.is_empty() {
        return Err(ScoringError::NoAnswers);
    }

    let by_id: HashMap<i64, &Question> = questions.iter().map(|q| (q.id, q)).collect();
    let mut seen = HashSet::new();
    let mut chosen = Vec::with_capacity(answers.len());

    for answer in answers {
        let question = by_id
            .get(&answer.question_id)
            .ok_or(ScoringError::UnknownQuestion(answer.question_id))?;
        if !seen.insert(answer.question_id) {
            return Err(ScoringError::DuplicateQuestion(answer.question_id));
        }
        let index = question
            .options
            .iter()
            .position(|o| o.id == answer.option_id)
            .ok_or(ScoringError::UnknownOption {
                question_id: answer.question_id,
                option_id: answer.option_id,
            })?;
        chosen.push((*question, index));
    }
    Ok(chosen)
}

/// Contribution of option `index` of `question` to `dimension`
fn contribution(question: &Question, index: usize, dimension: &str) -> f64 {
    let option = &question.options[index];
    if option.dimension_code != dimension {
        return 0.0;
    }
    if !question.reverse_scored {
        return option.score;
    }
    let (lo, hi) = question
        .options
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), o| {
            (lo.min(o.score), hi.max(o.score))
        });
    hi + lo - option.score
}

/// Sum raw, min and max per dimension over the answered questions
pub fn aggregate(kind: TestKind, chosen: &[(&Question, usize)]) -> Vec<DimensionScore> {
    kind.dimension_codes()
        .iter()
        .map(|&code| {
            let mut raw = 0.0;
            let mut min = 0.0;
            let mut max = 0.0;

            for (question, index) in chosen {
                if !question.options.iter().any(|o| o.dimension_code == code) {
                    continue;
                }
                let range = (0..question.options.len()).map(|i| contribution(question, i, code));
                let (lo, hi) = range.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
                    (lo.min(c), hi.max(c))
                });
                raw += contribution(question, *index, code);
                min += lo;
                max += hi;
            }

            let percentage = if max > min {
                round1((raw - min) / (max - min) * 100.0)
            } else {
                0.0
            };

            DimensionScore {
                code: code.to_string(),
                raw,
                min,
                max,
                percentage,
            }
        })
        .collect()
}

/// Validate, aggregate and interpret a submission
pub fn score_test(
    kind: TestKind,
    questions: &[Question],
    answers: &[Answer],
) -> Result<ScoringOutcome, ScoringError> {
    let chosen = validate(questions, answers)?;
    let dimensions = aggregate(kind, &chosen);
    let interpretation = interpret(kind, &dimensions);

    Ok(ScoringOutcome {
        result_code: interpretation.result_code,
        dimensions,
        top: interpretation.top,
        pairs: interpretation.pairs,
        answered: chosen.len(),
        total_questions: questions.len(),
        is_completed: chosen.len() == questions.len(),
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use cca_common::db::{AnswerOption, Question};

    /// Build a question whose options are `(dimension, score)` pairs
    ///
    /// Option IDs are `question_id * 10 + position`.
    pub fn question(id: i64, options: &[(&str, f64)], reverse_scored: bool) -> Question {
        Question {
            id,
            test_id: 0,
            section_id: None,
            text: format!("Q{}", id),
            display_order: id,
            reverse_scored,
            options: options
                .iter()
                .enumerate()
                .map(|(i, (dimension, score))| AnswerOption {
                    id: id * 10 + i as i64,
                    question_id: id,
                    text: format!("O{}", i),
                    dimension_code: dimension.to_string(),
                    score: *score,
                    display_order: i as i64 + 1,
                })
                .collect(),
        }
    }

    pub fn likert(id: i64, dimension: &str, reverse_scored: bool) -> Question {
        let options: Vec<(&str, f64)> = (1..=5).map(|s| (dimension, s as f64)).collect();
        question(id, &options, reverse_scored)
    }
}
