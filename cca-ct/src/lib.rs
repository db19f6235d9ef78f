//! cca-ct (Contact) - contact form submissions
//!
//! Stores messages sent through the site's contact form and lists them for
//! staff, newest first.

use axum::Router;
use cca_common::api::ApiAuthState;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod service;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5733;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub auth: ApiAuthState,
}

impl AppState {
    pub fn new(db: SqlitePool, auth: ApiAuthState) -> Self {
        Self { db, auth }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::get;

    let protected = Router::new()
        .route(
            "/api/contacts",
            get(api::list_contacts).post(api::submit_contact),
        )
        .route("/api/contacts/:contact_id", get(api::get_contact))
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
