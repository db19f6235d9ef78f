//! cca-au (Auth) - user accounts, email one-time codes and token pairs
//!
//! Other services never see raw tokens; they call `/api/auth/introspect`.

use axum::Router;
use cca_common::api::ApiAuthState;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod otp_sink;
pub mod secrets;
pub mod service;

use otp_sink::OtpSink;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5730;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub auth: ApiAuthState,
    pub otp_sink: Arc<dyn OtpSink>,
}

impl AppState {
    pub fn new(db: SqlitePool, auth: ApiAuthState, otp_sink: Arc<dyn OtpSink>) -> Self {
        Self { db, auth, otp_sink }
    }
}

/// Build application router
///
/// Health and build info are public; everything under `/api` requires
/// request signing unless the shared secret is 0.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let protected = Router::new()
        .route("/api/auth/register", post(api::register))
        .route("/api/auth/otp/request", post(api::request_otp))
        .route("/api/auth/otp/verify", post(api::verify_otp))
        .route("/api/auth/refresh", post(api::refresh))
        .route("/api/auth/logout", post(api::logout))
        .route("/api/auth/introspect", post(api::introspect))
        .route("/api/users/:user_id", get(api::get_user))
        .layer(middleware::from_fn_with_state(
            state.auth,
            cca_common::api::api_auth_middleware,
        ));

    let public = Router::new()
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
