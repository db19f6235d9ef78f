//! AI insight endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cca_common::api::{ApiError, ApiResult};

use crate::db::insights::StoredInsights;
use crate::insights;
use crate::jobs::Enqueued;
use crate::results::require_user;
use crate::AppState;

/// POST /api/users/:user_id/insights
///
/// Always 202; `created` is false when an earlier job is still pending.
pub async fn enqueue_insights(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<(StatusCode, Json<Enqueued>)> {
    require_user(&state.db, &user_id).await?;
    let enqueued = state.jobs.enqueue_insights(&user_id).await?;
    Ok((StatusCode::ACCEPTED, Json(enqueued)))
}

/// GET /api/users/:user_id/insights
pub async fn get_insights(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<StoredInsights>> {
    insights::cached_insights(&state.db, &state.cache, &user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No insights for user {}", user_id)))
}
