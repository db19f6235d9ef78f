//! HTTP-level tests for cca-ct

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cca_common::api::ApiAuthState;
use cca_common::db::init_database;
use cca_ct::db::contacts::{insert_contact, NewContact};
use cca_ct::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

async fn setup() -> (TempDir, SqlitePool, Router) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("cca.db")).await.unwrap();
    let router = build_router(AppState::new(pool.clone(), ApiAuthState::disabled()));
    (dir, pool, router)
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn message(subject: &str, text: &str) -> Value {
    json!({
        "name": "Ada Lovelace",
        "email": "Ada@Example.com",
        "subject": subject,
        "message": text,
    })
}

#[tokio::test]
async fn test_submit_and_fetch() {
    let (_dir, _pool, router) = setup().await;

    let (status, created) = send(
        &router,
        "POST",
        "/api/contacts",
        Some(message("Report question", "How do I read my RIASEC code?")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["email"], "ada@example.com");
    assert_eq!(created["subject"], "Report question");

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = send(&router, "GET", &format!("/api/contacts/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_submit_validation() {
    let (_dir, _pool, router) = setup().await;

    let (status, body) = send(&router, "POST", "/api/contacts", Some(message("Hi", "short"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let long_subject = "x".repeat(201);
    let (status, _) = send(
        &router,
        "POST",
        "/api/contacts",
        Some(message(&long_subject, "A perfectly fine message")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_email = message("Hi", "A perfectly fine message");
    bad_email["email"] = json!("nobody");
    let (status, _) = send(&router, "POST", "/api/contacts", Some(bad_email)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = send(&router, "GET", "/api/contacts", None).await;
    assert_eq!(list["total"], 0);
}

#[tokio::test]
async fn test_unknown_contact_not_found() {
    let (_dir, _pool, router) = setup().await;
    let (status, body) = send(&router, "GET", "/api/contacts/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_list_paginates_newest_first() {
    let (_dir, pool, router) = setup().await;
    for i in 0..105 {
        insert_contact(
            &pool,
            &NewContact {
                name: format!("Sender {}", i),
                email: format!("sender{}@example.com", i),
                subject: format!("Message {}", i),
                message: "Hello there, a question.".to_string(),
            },
        )
        .await
        .unwrap();
    }

    let (status, first) = send(&router, "GET", "/api/contacts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["total"], 105);
    assert_eq!(first["page"], 1);
    assert_eq!(first["total_pages"], 2);
    let contacts = first["contacts"].as_array().unwrap();
    assert_eq!(contacts.len(), 100);
    assert_eq!(contacts[0]["subject"], "Message 104");

    let (_, second) = send(&router, "GET", "/api/contacts?page=2", None).await;
    let contacts = second["contacts"].as_array().unwrap();
    assert_eq!(contacts.len(), 5);
    assert_eq!(contacts[4]["subject"], "Message 0");

    // Out-of-range pages clamp to the last page
    let (_, clamped) = send(&router, "GET", "/api/contacts?page=9", None).await;
    assert_eq!(clamped["page"], 2);
}

#[tokio::test]
async fn test_health_is_public() {
    let (_dir, _pool, router) = setup().await;
    let (status, body) = send(&router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["module"], "cca-ct");
}
