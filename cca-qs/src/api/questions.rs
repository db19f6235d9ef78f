//! Question endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use cca_common::api::ApiResult;
use cca_common::db::Question;
use serde::{Deserialize, Serialize};

use crate::service::{self, SectionGroup};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct QuestionsQuery {
    /// Return questions bucketed by section instead of a flat list
    #[serde(default)]
    pub grouped: bool,
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub test_id: i64,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<Question>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<SectionGroup>>,
}

/// GET /api/tests/:test_id/questions[?grouped=true]
pub async fn get_questions(
    State(state): State<AppState>,
    Path(test_id): Path<i64>,
    Query(query): Query<QuestionsQuery>,
) -> ApiResult<Json<QuestionsResponse>> {
    let questions = service::test_questions(&state.db, &state.cache, test_id).await?;
    let total = questions.len();

    let response = if query.grouped {
        let detail = service::test_detail(&state.db, &state.cache, test_id).await?;
        QuestionsResponse {
            test_id,
            total,
            questions: None,
            sections: Some(service::group_by_section(&detail.sections, questions)),
        }
    } else {
        QuestionsResponse {
            test_id,
            total,
            questions: Some(questions),
            sections: None,
        }
    };
    Ok(Json(response))
}

/// GET /api/questions/:question_id
pub async fn get_question(
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
) -> ApiResult<Json<Question>> {
    Ok(Json(service::question(&state.db, question_id).await?))
}
