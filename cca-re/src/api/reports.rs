//! Comprehensive report endpoints

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use cca_common::api::ApiResult;
use serde::Deserialize;

use crate::jobs::Enqueued;
use crate::reports::{self, ReportFormat};
use crate::results::require_user;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub format: ReportFormat,
}

#[derive(Debug, Default, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub format: ReportFormat,
}

/// GET /api/users/:user_id/report[?format=json|markdown]
pub async fn get_report(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Response> {
    let report = reports::build_report(&state.db, &state.cache, &user_id).await?;
    let response = match query.format {
        ReportFormat::Json => Json(report).into_response(),
        ReportFormat::Markdown => (
            [(header::CONTENT_TYPE, ReportFormat::Markdown.content_type())],
            reports::render_markdown(&report),
        )
            .into_response(),
    };
    Ok(response)
}

/// POST /api/users/:user_id/report/jobs
///
/// Renders in the background; the job result holds the document.
pub async fn enqueue_report(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<RenderRequest>,
) -> ApiResult<(StatusCode, Json<Enqueued>)> {
    require_user(&state.db, &user_id).await?;
    let enqueued = state.jobs.enqueue_report(&user_id, req.format).await?;
    Ok((StatusCode::ACCEPTED, Json(enqueued)))
}
