//! HTTP-level tests for cca-qs against a seeded temporary database

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cca_common::api::{calculate_hash, ApiAuthState};
use cca_common::cache::{keys, CacheProvider};
use cca_common::db::init_database;
use cca_common::time::now_millis;
use cca_qs::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

async fn setup(cache: CacheProvider, auth: ApiAuthState) -> (TempDir, SqlitePool, Router) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("cca.db")).await.unwrap();
    let router = build_router(AppState::new(pool.clone(), auth, cache));
    (dir, pool, router)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_list_tests_in_catalog_order() {
    let (_dir, _pool, router) = setup(CacheProvider::noop(), ApiAuthState::disabled()).await;
    let (status, body) = get(&router, "/api/tests").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 7);
    let codes: Vec<&str> = body["tests"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["code"].as_str().unwrap())
        .collect();
    assert_eq!(
        codes,
        vec!["MBTI", "BIG_FIVE", "DISC", "ENNEAGRAM", "GARDNER", "RIASEC", "VARK"]
    );
    assert_eq!(body["tests"][1]["question_count"], 10);
}

#[tokio::test]
async fn test_inactive_test_is_hidden() {
    let (_dir, pool, router) = setup(CacheProvider::noop(), ApiAuthState::disabled()).await;
    sqlx::query("UPDATE tests SET is_active = 0 WHERE id = 7")
        .execute(&pool)
        .await
        .unwrap();

    let (_, body) = get(&router, "/api/tests").await;
    assert_eq!(body["total"], 6);

    let (status, body) = get(&router, "/api/tests/7").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = get(&router, "/api/tests/7/questions").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_question_of_inactive_test_is_hidden() {
    let (_dir, pool, router) = setup(CacheProvider::noop(), ApiAuthState::disabled()).await;
    let (id,): (i64,) = sqlx::query_as("SELECT id FROM questions WHERE test_id = 7 LIMIT 1")
        .fetch_one(&pool)
        .await
        .unwrap();

    let (status, _) = get(&router, &format!("/api/questions/{}", id)).await;
    assert_eq!(status, StatusCode::OK);

    sqlx::query("UPDATE tests SET is_active = 0 WHERE id = 7")
        .execute(&pool)
        .await
        .unwrap();
    let (status, body) = get(&router, &format!("/api/questions/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_detail_has_sections_and_dimensions() {
    let (_dir, _pool, router) = setup(CacheProvider::noop(), ApiAuthState::disabled()).await;
    let (status, body) = get(&router, "/api/tests/1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "MBTI");
    assert_eq!(body["dimensions"].as_array().unwrap().len(), 8);
    assert_eq!(body["sections"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_unknown_test_is_not_found() {
    let (_dir, _pool, router) = setup(CacheProvider::noop(), ApiAuthState::disabled()).await;
    let (status, _) = get(&router, "/api/tests/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_questions_flat_and_grouped() {
    let (_dir, _pool, router) = setup(CacheProvider::noop(), ApiAuthState::disabled()).await;

    let (status, flat) = get(&router, "/api/tests/2/questions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(flat["total"], 10);
    let questions = flat["questions"].as_array().unwrap();
    let orders: Vec<i64> = questions
        .iter()
        .map(|q| q["display_order"].as_i64().unwrap())
        .collect();
    assert_eq!(orders, (1..=10).collect::<Vec<_>>());
    assert_eq!(questions[0]["options"].as_array().unwrap().len(), 5);
    assert!(flat.get("sections").is_none());

    let (status, grouped) = get(&router, "/api/tests/1/questions?grouped=true").await;
    assert_eq!(status, StatusCode::OK);
    assert!(grouped.get("questions").is_none());
    let sections = grouped["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 4);
    let grouped_total: usize = sections
        .iter()
        .map(|s| s["questions"].as_array().unwrap().len())
        .sum();
    assert_eq!(grouped_total as i64, grouped["total"].as_i64().unwrap());
}

#[tokio::test]
async fn test_single_question() {
    let (_dir, _pool, router) = setup(CacheProvider::noop(), ApiAuthState::disabled()).await;
    let (_, flat) = get(&router, "/api/tests/3/questions").await;
    let id = flat["questions"][0]["id"].as_i64().unwrap();

    let (status, body) = get(&router, &format!("/api/questions/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["test_id"], 3);
    assert_eq!(body["options"].as_array().unwrap().len(), 4);

    let (status, _) = get(&router, "/api/questions/999999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_questions_are_cached() {
    let cache = CacheProvider::memory(100, Duration::from_secs(60));
    let (_dir, pool, router) = setup(cache.clone(), ApiAuthState::disabled()).await;

    let (_, first) = get(&router, "/api/tests/2/questions").await;
    assert!(cache.get(&keys::test_questions(2)).await.unwrap().is_some());

    // A cached read does not see direct database edits
    sqlx::query("UPDATE questions SET text = 'changed' WHERE test_id = 2")
        .execute(&pool)
        .await
        .unwrap();
    let (_, second) = get(&router, "/api/tests/2/questions").await;
    assert_eq!(first, second);

    cache.delete(&keys::test_questions(2)).await.unwrap();
    let (_, third) = get(&router, "/api/tests/2/questions").await;
    assert_eq!(third["questions"][0]["text"], "changed");
}

#[tokio::test]
async fn test_get_requires_signed_query_when_secret_set() {
    let secret = 42_424_242;
    let (_dir, _pool, router) = setup(CacheProvider::noop(), ApiAuthState::new(secret)).await;

    let (status, _) = get(&router, "/api/tests").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let timestamp = now_millis();
    let hash = calculate_hash(
        &json!({ "timestamp": timestamp.to_string(), "hash": "" }),
        secret,
    );
    let (status, body) = get(
        &router,
        &format!("/api/tests?timestamp={}&hash={}", timestamp, hash),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    // Health stays public
    let (status, _) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
}
