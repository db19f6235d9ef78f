//! cca-re (Results) - scoring, completion tracking, reports and AI insights
//!
//! Submitted answers are scored against the catalog, stored one row per
//! user and test, and summarized into completion status and reports. Slow
//! work (AI insights, report rendering) runs as background jobs whose state
//! changes stream over SSE.

use axum::Router;
use cca_common::api::ApiAuthState;
use cca_common::cache::CacheProvider;
use cca_common::events::EventBus;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod completion;
pub mod config;
pub mod db;
pub mod insights;
pub mod jobs;
pub mod reports;
pub mod results;
pub mod scoring;

use insights::InsightGenerator;
use jobs::JobRunner;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5732;

/// Event bus capacity; slower SSE clients skip ahead
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub auth: ApiAuthState,
    pub cache: CacheProvider,
    pub events: EventBus,
    pub jobs: JobRunner,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        auth: ApiAuthState,
        cache: CacheProvider,
        generator: Arc<dyn InsightGenerator>,
    ) -> Self {
        let events = EventBus::new(EVENT_BUS_CAPACITY);
        let jobs = JobRunner::new(db.clone(), cache.clone(), events.clone(), generator);
        Self {
            db,
            auth,
            cache,
            events,
            jobs,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let protected = Router::new()
        .route("/api/users/:user_id/results", get(api::list_results))
        .route(
            "/api/users/:user_id/results/:test_id",
            get(api::get_result)
                .post(api::submit_result)
                .delete(api::delete_result),
        )
        .route("/api/users/:user_id/completion", get(api::get_completion))
        .route("/api/users/:user_id/report", get(api::get_report))
        .route("/api/users/:user_id/report/jobs", post(api::enqueue_report))
        .route(
            "/api/users/:user_id/insights",
            get(api::get_insights).post(api::enqueue_insights),
        )
        .route("/api/users/:user_id/jobs", get(api::list_jobs))
        .route("/api/jobs/:job_id", get(api::get_job))
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
