//! Contact form endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use cca_common::api::ApiResult;
use cca_common::pagination::PageQuery;

use crate::db::contacts::Contact;
use crate::service::{self, ContactPage, ContactRequest};
use crate::AppState;

/// POST /api/contacts
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(req): Json<ContactRequest>,
) -> ApiResult<(StatusCode, Json<Contact>)> {
    let contact = service::submit(&state.db, &req).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

/// GET /api/contacts/:contact_id
pub async fn get_contact(
    State(state): State<AppState>,
    Path(contact_id): Path<String>,
) -> ApiResult<Json<Contact>> {
    service::get(&state.db, &contact_id).await.map(Json)
}

/// GET /api/contacts[?page=N]
pub async fn list_contacts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ContactPage>> {
    service::list(&state.db, query.page).await.map(Json)
}
