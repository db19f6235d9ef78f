//! Result submission, lookup and completion status

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cca_common::api::ApiResult;
use serde::{Deserialize, Serialize};

use crate::completion::{self, CompletionStatus};
use crate::db::results::TestResult;
use crate::results::{self, ResultView};
use crate::scoring::Answer;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub answers: Vec<Answer>,
}

#[derive(Debug, Serialize)]
pub struct ResultListResponse {
    pub user_id: String,
    pub results: Vec<TestResult>,
    pub total: usize,
}

/// POST /api/users/:user_id/results/:test_id
pub async fn submit_result(
    State(state): State<AppState>,
    Path((user_id, test_id)): Path<(String, i64)>,
    Json(req): Json<SubmitRequest>,
) -> ApiResult<(StatusCode, Json<ResultView>)> {
    let view = results::submit(
        &state.db,
        &state.cache,
        &state.events,
        &user_id,
        test_id,
        &req.answers,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/users/:user_id/results
pub async fn list_results(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ResultListResponse>> {
    let results = results::list(&state.db, &user_id).await?;
    Ok(Json(ResultListResponse {
        user_id,
        total: results.len(),
        results,
    }))
}

/// GET /api/users/:user_id/results/:test_id
pub async fn get_result(
    State(state): State<AppState>,
    Path((user_id, test_id)): Path<(String, i64)>,
) -> ApiResult<Json<ResultView>> {
    Ok(Json(results::get(&state.db, &user_id, test_id).await?))
}

/// DELETE /api/users/:user_id/results/:test_id
pub async fn delete_result(
    State(state): State<AppState>,
    Path((user_id, test_id)): Path<(String, i64)>,
) -> ApiResult<StatusCode> {
    results::delete(&state.db, &state.cache, &state.events, &user_id, test_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/:user_id/completion
pub async fn get_completion(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<CompletionStatus>> {
    results::require_user(&state.db, &user_id).await?;
    Ok(Json(
        completion::completion_status(&state.db, &state.cache, &user_id).await?,
    ))
}
