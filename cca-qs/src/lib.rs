//! cca-qs (Questions) - read-only access to the assessment catalog
//!
//! Serves tests, their sections and dimensions, and ordered questions with
//! answer options. Catalog reads go through the cache-aside layer.

use axum::Router;
use cca_common::api::ApiAuthState;
use cca_common::cache::CacheProvider;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod service;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5731;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub auth: ApiAuthState,
    pub cache: CacheProvider,
}

impl AppState {
    pub fn new(db: SqlitePool, auth: ApiAuthState, cache: CacheProvider) -> Self {
        Self { db, auth, cache }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::get;

    let protected = Router::new()
        .route("/api/tests", get(api::list_tests))
        .route("/api/tests/:test_id", get(api::get_test))
        .route("/api/tests/:test_id/questions", get(api::get_questions))
        .route("/api/questions/:question_id", get(api::get_question))
        .layer(middleware::from_fn_with_state(
            state.auth,
            cca_common::api::api_auth_middleware,
        ));

    let public = Router::new()
        .route("/api/buildinfo", get(api::get_build_info))
        .route("/events", get(api::event_stream))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
