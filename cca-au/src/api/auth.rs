//! Registration, login and token endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::db::users::User;
use crate::service::{self, Introspection, OtpIssued, TokenPair};
use crate::AppState;
use cca_common::api::ApiResult;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpVerifyRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct IntrospectRequest {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub tokens: TokenPair,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = service::register(&state.db, &req.email, req.name.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/otp/request
pub async fn request_otp(
    State(state): State<AppState>,
    Json(req): Json<OtpRequest>,
) -> ApiResult<(StatusCode, Json<OtpIssued>)> {
    let issued = service::request_otp(&state.db, state.otp_sink.as_ref(), &req.email).await?;
    Ok((StatusCode::ACCEPTED, Json(issued)))
}

/// POST /api/auth/otp/verify
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<OtpVerifyRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let (user, tokens) = service::verify_otp(&state.db, &req.email, &req.code).await?;
    Ok(Json(LoginResponse { user, tokens }))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<TokenPair>> {
    Ok(Json(service::refresh(&state.db, &req.refresh_token).await?))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<StatusCode> {
    service::logout(&state.db, &req.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/introspect
pub async fn introspect(
    State(state): State<AppState>,
    Json(req): Json<IntrospectRequest>,
) -> ApiResult<Json<Introspection>> {
    Ok(Json(service::introspect(&state.db, &req.access_token).await?))
}
