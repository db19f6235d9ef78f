//! Test listing and detail

use axum::{
    extract::{Path, State},
    Json,
};
use cca_common::api::ApiResult;
use cca_common::db::Test;
use serde::Serialize;

use crate::service::{self, TestDetail};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TestListResponse {
    pub tests: Vec<Test>,
    pub total: usize,
}

/// GET /api/tests
pub async fn list_tests(State(state): State<AppState>) -> ApiResult<Json<TestListResponse>> {
    let tests = service::list_active_tests(&state.db, &state.cache).await?;
    Ok(Json(TestListResponse {
        total: tests.len(),
        tests,
    }))
}

/// GET /api/tests/:test_id
pub async fn get_test(
    State(state): State<AppState>,
    Path(test_id): Path<i64>,
) -> ApiResult<Json<TestDetail>> {
    Ok(Json(service::test_detail(&state.db, &state.cache, test_id).await?))
}
