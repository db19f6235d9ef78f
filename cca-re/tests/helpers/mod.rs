//! Shared fixtures for cca-re integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cca_common::api::ApiAuthState;
use cca_common::cache::CacheProvider;
use cca_common::db::catalog::load_questions;
use cca_common::db::init_database;
use cca_common::time::{now, to_db};
use cca_re::insights::{InsightError, InsightGenerator};
use cca_re::reports::ComprehensiveReport;
use cca_re::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub _dir: TempDir,
    pub pool: SqlitePool,
    pub state: AppState,
    pub router: Router,
}

pub async fn setup_with(cache: CacheProvider, generator: Arc<dyn InsightGenerator>) -> TestApp {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("cca.db")).await.unwrap();
    let state = AppState::new(pool.clone(), ApiAuthState::disabled(), cache, generator);
    TestApp {
        _dir: dir,
        pool,
        router: build_router(state.clone()),
        state,
    }
}

pub async fn setup() -> TestApp {
    setup_with(CacheProvider::noop(), Arc::new(StaticGenerator)).await
}

pub async fn create_user(pool: &SqlitePool, id: &str) {
    let ts = to_db(now());
    sqlx::query(
        "INSERT INTO users (id, email, name, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(format!("{}@example.com", id))
    .bind(format!("User {}", id))
    .bind(&ts)
    .bind(&ts)
    .execute(pool)
    .await
    .unwrap();
}

/// Answer every question of a test, picking the option whose dimension
/// `prefer` ranks first (falling back to the first option)
pub async fn answers_for(pool: &SqlitePool, test_id: i64, prefer: &[&str]) -> Value {
    let questions = load_questions(pool, test_id).await.unwrap();
    let answers: Vec<Value> = questions
        .iter()
        .map(|q| {
            let option = prefer
                .iter()
                .find_map(|dim| q.options.iter().find(|o| o.dimension_code == *dim))
                .unwrap_or(&q.options[0]);
            json!({ "question_id": q.id, "option_id": option.id })
        })
        .collect();
    Value::Array(answers)
}

/// Answer Likert items: `score_for(dimension)` picks the 1..=5 option
pub async fn likert_answers<F>(pool: &SqlitePool, test_id: i64, score_for: F) -> Value
where
    F: Fn(&str) -> f64,
{
    let questions = load_questions(pool, test_id).await.unwrap();
    let answers: Vec<Value> = questions
        .iter()
        .map(|q| {
            let wanted = score_for(&q.options[0].dimension_code);
            let option = q
                .options
                .iter()
                .find(|o| o.score == wanted)
                .unwrap_or(&q.options[0]);
            json!({ "question_id": q.id, "option_id": option.id })
        })
        .collect();
    Value::Array(answers)
}

pub async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
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
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

pub async fn submit(app: &TestApp, user: &str, test_id: i64, answers: Value) -> (StatusCode, Value) {
    send(
        &app.router,
        "POST",
        &format!("/api/users/{}/results/{}", user, test_id),
        Some(json!({ "answers": answers })),
    )
    .await
}

/// Poll a job until it reaches a terminal state
pub async fn wait_for_job(app: &TestApp, job_id: &str) -> Value {
    for _ in 0..500 {
        let (status, job) = send(&app.router, "GET", &format!("/api/jobs/{}", job_id), None).await;
        assert_eq!(status, StatusCode::OK);
        if job["state"] == "SUCCEEDED" || job["state"] == "FAILED" {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not finish", job_id);
}

/// Always returns the same insights
pub struct StaticGenerator;

#[async_trait]
impl InsightGenerator for StaticGenerator {
    fn model(&self) -> &str {
        "static-test"
    }

    async fn generate(&self, report: &ComprehensiveReport) -> Result<Value, InsightError> {
        Ok(json!({
            "summary": format!("{} completed {} tests", report.user.email, report.sections.len()),
            "career_paths": ["Research"]
        }))
    }
}

/// Fails with a transient error `failures` times, then succeeds
pub struct FlakyGenerator {
    pub failures: u32,
    pub calls: AtomicU32,
}

impl FlakyGenerator {
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl InsightGenerator for FlakyGenerator {
    fn model(&self) -> &str {
        "flaky-test"
    }

    async fn generate(&self, _report: &ComprehensiveReport) -> Result<Value, InsightError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(InsightError::Network("connection reset".to_string()));
        }
        Ok(json!({ "summary": "eventually" }))
    }
}

/// Rejects every request as unauthorized (not retryable)
pub struct RejectingGenerator;

#[async_trait]
impl InsightGenerator for RejectingGenerator {
    fn model(&self) -> &str {
        "rejecting-test"
    }

    async fn generate(&self, _report: &ComprehensiveReport) -> Result<Value, InsightError> {
        Err(InsightError::Api {
            status: 401,
            message: "invalid api key".to_string(),
        })
    }
}

/// Takes a while, so a second request finds the job still pending
pub struct SlowGenerator(pub Duration);

#[async_trait]
impl InsightGenerator for SlowGenerator {
    fn model(&self) -> &str {
        "slow-test"
    }

    async fn generate(&self, _report: &ComprehensiveReport) -> Result<Value, InsightError> {
        tokio::time::sleep(self.0).await;
        Ok(json!({ "summary": "slow" }))
    }
}
