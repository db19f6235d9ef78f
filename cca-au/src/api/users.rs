//! User lookup

use axum::{
    extract::{Path, State},
    Json,
};

use crate::db::users::{self, User};
use crate::AppState;
use cca_common::api::{ApiError, ApiResult};

/// GET /api/users/:user_id
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<User>> {
    users::find_by_id(&state.db, &user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("User not found: {}", user_id)))
}
