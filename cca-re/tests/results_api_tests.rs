//! Result submission, completion and report endpoints

mod helpers;

use axum::http::StatusCode;
use cca_common::cache::CacheProvider;
use cca_common::events::CcaEvent;
use helpers::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const INTJ: &[&str] = &["I", "N", "T", "J"];

#[tokio::test]
async fn test_submit_mbti_scores_and_interprets() {
    let app = setup().await;
    create_user(&app.pool, "u1").await;

    let answers = answers_for(&app.pool, 1, INTJ).await;
    let (status, body) = submit(&app, "u1", 1, answers).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result_code"], "INTJ");
    assert_eq!(body["test_code"], "MBTI");
    assert_eq!(body["is_completed"], true);
    assert!(body["completed_at"].is_string());
    assert_eq!(body["interpretation"]["title"], "The Architect");

    let pairs = body["scores"]["pairs"].as_array().unwrap();
    assert_eq!(pairs.len(), 4);

    let (status, fetched) = send(&app.router, "GET", "/api/users/u1/results/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], body["id"]);
}

#[tokio::test]
async fn test_partial_answers_are_not_completed() {
    let app = setup().await;
    create_user(&app.pool, "u1").await;

    let mut answers = answers_for(&app.pool, 1, INTJ).await;
    answers.as_array_mut().unwrap().truncate(3);
    let (status, body) = submit(&app, "u1", 1, answers).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["is_completed"], false);
    assert!(body["completed_at"].is_null());
    assert_eq!(body["scores"]["answered"], 3);

    let (_, completion) = send(&app.router, "GET", "/api/users/u1/completion", None).await;
    assert_eq!(completion["completed_count"], 0);
}

#[tokio::test]
async fn test_submit_rejects_bad_answers() {
    let app = setup().await;
    create_user(&app.pool, "u1").await;

    let (status, _) = submit(&app, "u1", 1, json!([])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Question from the Big Five test submitted against MBTI
    let big_five = answers_for(&app.pool, 2, &[]).await;
    let (status, _) = submit(&app, "u1", 1, json!([big_five[0].clone()])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Option belonging to a different question
    let mbti = answers_for(&app.pool, 1, INTJ).await;
    let mismatched = json!([{
        "question_id": mbti[0]["question_id"],
        "option_id": mbti[1]["option_id"],
    }]);
    let (status, body) = submit(&app, "u1", 1, mismatched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].as_str().unwrap().contains("not an answer"));

    let (status, _) = send(&app.router, "GET", "/api/users/u1/results", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_test_or_user_not_found() {
    let app = setup().await;
    create_user(&app.pool, "u1").await;
    let answers = answers_for(&app.pool, 1, INTJ).await;

    let (status, _) = submit(&app, "u1", 99, answers.clone()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = submit(&app, "ghost", 1, answers).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app.router, "GET", "/api/users/u1/results/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_retake_replaces_previous_result() {
    let app = setup().await;
    create_user(&app.pool, "u1").await;

    let (_, first) = submit(&app, "u1", 1, answers_for(&app.pool, 1, INTJ).await).await;
    let (status, second) = submit(
        &app,
        "u1",
        1,
        answers_for(&app.pool, 1, &["E", "S", "F", "P"]).await,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["result_code"], "ESFP");
    assert_eq!(second["id"], first["id"]);

    let (_, list) = send(&app.router, "GET", "/api/users/u1/results", None).await;
    let results = list["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["result_code"], "ESFP");
}

#[tokio::test]
async fn test_completion_tracks_progress_through_cache() {
    let app = setup_with(
        CacheProvider::memory(1_000, Duration::from_secs(300)),
        Arc::new(StaticGenerator),
    )
    .await;
    create_user(&app.pool, "u1").await;

    let (_, before) = send(&app.router, "GET", "/api/users/u1/completion", None).await;
    assert_eq!(before["completed_count"], 0);
    assert_eq!(before["total"], 7);
    assert_eq!(before["next_test"]["test_id"], 1);

    submit(&app, "u1", 1, answers_for(&app.pool, 1, INTJ).await).await;
    let big_five = likert_answers(&app.pool, 2, |_| 4.0).await;
    let (status, _) = submit(&app, "u1", 2, big_five).await;
    assert_eq!(status, StatusCode::CREATED);

    // Submissions invalidate the cached status
    let (status, after) = send(&app.router, "GET", "/api/users/u1/completion", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["completed_count"], 2);
    assert_eq!(after["percentage"], 28.6);
    assert_eq!(after["all_completed"], false);
    assert_eq!(after["next_test"]["test_id"], 3);
    assert_eq!(after["next_test"]["code"], "DISC");
}

#[tokio::test]
async fn test_delete_result() {
    let app = setup().await;
    create_user(&app.pool, "u1").await;
    submit(&app, "u1", 1, answers_for(&app.pool, 1, INTJ).await).await;

    let (status, _) = send(&app.router, "DELETE", "/api/users/u1/results/1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app.router, "DELETE", "/api/users/u1/results/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, completion) = send(&app.router, "GET", "/api/users/u1/completion", None).await;
    assert_eq!(completion["completed_count"], 0);
}

#[tokio::test]
async fn test_submission_publishes_event() {
    let app = setup().await;
    create_user(&app.pool, "u1").await;
    let mut rx = app.state.events.subscribe();

    submit(&app, "u1", 1, answers_for(&app.pool, 1, INTJ).await).await;

    match rx.recv().await.unwrap() {
        CcaEvent::ResultSubmitted {
            user_id,
            test_id,
            result_code,
            is_completed,
            ..
        } => {
            assert_eq!(user_id, "u1");
            assert_eq!(test_id, 1);
            assert_eq!(result_code, "INTJ");
            assert!(is_completed);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_enneagram_wing_falls_back_to_core_type() {
    let app = setup().await;
    create_user(&app.pool, "u1").await;

    let answers = likert_answers(&app.pool, 4, |dim| match dim {
        "4" => 5.0,
        "5" => 4.0,
        _ => 2.0,
    })
    .await;
    let (status, body) = submit(&app, "u1", 4, answers).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result_code"], "4w5");
    assert_eq!(body["interpretation"]["result_code"], "4");
    assert_eq!(body["interpretation"]["title"], "Type 4: The Individualist");
}

#[tokio::test]
async fn test_report_json_and_markdown() {
    let app = setup().await;
    create_user(&app.pool, "u1").await;
    submit(&app, "u1", 1, answers_for(&app.pool, 1, INTJ).await).await;

    let (status, report) = send(&app.router, "GET", "/api/users/u1/report", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["user"]["email"], "u1@example.com");
    assert_eq!(report["completion"]["completed_count"], 1);
    assert_eq!(report["sections"].as_array().unwrap().len(), 1);
    assert_eq!(report["sections"][0]["result_code"], "INTJ");
    assert!(report["insights"].is_null());

    let (status, markdown) =
        send(&app.router, "GET", "/api/users/u1/report?format=markdown", None).await;
    assert_eq!(status, StatusCode::OK);
    let text = markdown.as_str().unwrap();
    assert!(text.starts_with("# Career Compass Report: User u1"));
    assert!(text.contains("## Myers-Briggs Type Indicator: The Architect (INTJ)"));

    let (status, _) = send(&app.router, "GET", "/api/users/ghost/report", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
