//! Database models shared by more than one service

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

/// An assessment as listed to users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: String,
    pub estimated_minutes: i64,
    pub display_order: i64,
    pub is_active: bool,
    pub question_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSection {
    pub id: i64,
    pub test_id: i64,
    pub title: String,
    pub description: String,
    pub display_order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestDimension {
    pub id: i64,
    pub test_id: i64,
    pub code: String,
    pub name: String,
    pub description: String,
}

/// A selectable answer; contributes `score` to `dimension_code`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub dimension_code: String,
    pub score: f64,
    pub display_order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub test_id: i64,
    pub section_id: Option<i64>,
    pub text: String,
    pub display_order: i64,
    pub reverse_scored: bool,
    pub options: Vec<AnswerOption>,
}

/// Human-readable interpretation of a result code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultConfiguration {
    pub test_id: i64,
    pub result_code: String,
    pub title: String,
    pub description: String,
    pub strengths: Vec<String>,
    pub career_suggestions: Vec<String>,
}
