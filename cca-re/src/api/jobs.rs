//! Job status polling

use axum::{
    extract::{Path, State},
    Json,
};
use cca_common::api::{ApiError, ApiResult};
use serde::Serialize;

use crate::db::jobs::{self, Job};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub user_id: String,
    pub jobs: Vec<Job>,
}

/// GET /api/jobs/:job_id
pub async fn get_job(State(state): State<AppState>, Path(job_id): Path<String>) -> ApiResult<Json<Job>> {
    jobs::get_job(&state.db, &job_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Job not found: {}", job_id)))
}

/// GET /api/users/:user_id/jobs
pub async fn list_jobs(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<JobListResponse>> {
    let jobs = jobs::list_jobs(&state.db, &user_id).await?;
    Ok(Json(JobListResponse { user_id, jobs }))
}
