//! Axum middleware wrapping [`super::auth`]
//!
//! Applied to protected routes only; health and SSE routes stay public.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::warn;

use super::auth::{validate_hash, validate_timestamp, ApiAuthError, TimestampWindow};
use super::types::ErrorBody;

/// Largest request body the middleware will buffer
pub const MAX_AUTH_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Middleware state: the loaded shared secret and accepted clock skew
#[derive(Debug, Clone, Copy)]
pub struct ApiAuthState {
    pub shared_secret: i64,
    pub window: TimestampWindow,
}

impl ApiAuthState {
    pub fn new(shared_secret: i64) -> Self {
        Self {
            shared_secret,
            window: TimestampWindow::default(),
        }
    }

    /// Secret 0 disables all checking
    pub fn disabled() -> Self {
        Self::new(0)
    }

    pub fn is_disabled(&self) -> bool {
        self.shared_secret == 0
    }
}

/// Authentication middleware
///
/// Returns 401 when the timestamp or hash is wrong, 400 when the auth
/// fields are missing or unparseable.
pub async fn api_auth_middleware(
    State(auth): State<ApiAuthState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if auth.is_disabled() {
        return Ok(next.run(request).await);
    }

    let carries_body = matches!(
        *request.method(),
        Method::POST | Method::PUT | Method::PATCH
    );

    if carries_body {
        let (parts, body) = request.into_parts();
        let body_bytes = axum::body::to_bytes(body, MAX_AUTH_BODY_BYTES)
            .await
            .map_err(|e| AuthError::ParseError(format!("Failed to read body: {}", e)))?;

        let json_value: Value = serde_json::from_slice(&body_bytes)
            .map_err(|e| AuthError::ParseError(format!("Invalid JSON: {}", e)))?;

        let timestamp = json_value
            .get("timestamp")
            .and_then(Value::as_i64)
            .ok_or_else(|| AuthError::MissingFields("timestamp".to_string()))?;
        let hash = json_value
            .get("hash")
            .and_then(Value::as_str)
            .ok_or_else(|| AuthError::MissingFields("hash".to_string()))?
            .to_string();

        check(&auth, timestamp, &hash, &json_value)?;

        // Restore the body for downstream extractors
        let request = Request::from_parts(parts, Body::from(body_bytes));
        Ok(next.run(request).await)
    } else {
        let params: HashMap<String, String> = request
            .uri()
            .query()
            .map(|q| {
                axum::extract::Query::<HashMap<String, String>>::try_from_uri(request.uri())
                    .map(|axum::extract::Query(map)| map)
                    .map_err(|e| AuthError::ParseError(format!("Invalid query '{}': {}", q, e)))
            })
            .transpose()?
            .unwrap_or_default();

        let timestamp = params
            .get("timestamp")
            .ok_or_else(|| AuthError::MissingFields("timestamp".to_string()))?
            .parse::<i64>()
            .map_err(|e| AuthError::ParseError(format!("timestamp: {}", e)))?;
        let hash = params
            .get("hash")
            .ok_or_else(|| AuthError::MissingFields("hash".to_string()))?
            .clone();

        let json_value = Value::Object(
            params
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect::<Map<String, Value>>(),
        );

        check(&auth, timestamp, &hash, &json_value)?;
        Ok(next.run(request).await)
    }
}

fn check(auth: &ApiAuthState, timestamp: i64, hash: &str, value: &Value) -> Result<(), AuthError> {
    validate_timestamp(timestamp, auth.window).map_err(|e| match e {
        ApiAuthError::InvalidTimestamp { reason, .. } => AuthError::InvalidTimestamp(reason),
        other => AuthError::Other(other.to_string()),
    })?;

    validate_hash(hash, value, auth.shared_secret).map_err(|e| match e {
        ApiAuthError::InvalidHash { provided, calculated } => {
            warn!(
                "Hash validation failed: provided={}, calculated={}",
                provided, calculated
            );
            AuthError::InvalidHash
        }
        other => AuthError::Other(other.to_string()),
    })
}

/// Authentication error types for HTTP responses
#[derive(Debug)]
pub enum AuthError {
    InvalidTimestamp(String),
    InvalidHash,
    MissingFields(String),
    ParseError(String),
    Other(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AuthError::InvalidTimestamp(reason) => (
                StatusCode::UNAUTHORIZED,
                "TIMESTAMP_INVALID",
                format!("Invalid timestamp: {}", reason),
            ),
            AuthError::InvalidHash => (
                StatusCode::UNAUTHORIZED,
                "HASH_INVALID",
                "Invalid hash".to_string(),
            ),
            AuthError::MissingFields(field) => (
                StatusCode::BAD_REQUEST,
                "AUTH_FIELDS_MISSING",
                format!("Missing required auth field: {}", field),
            ),
            AuthError::ParseError(msg) => (
                StatusCode::BAD_REQUEST,
                "AUTH_PARSE_ERROR",
                format!("Parse error: {}", msg),
            ),
            AuthError::Other(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_ERROR",
                format!("Authentication error: {}", msg),
            ),
        };

        (status, Json(ErrorBody::new(code, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::{calculate_hash, sign_body, DUMMY_HASH};
    use axum::{routing::get, routing::post, Router};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    const SECRET: i64 = 424242;

    fn app(auth: ApiAuthState) -> Router {
        Router::new()
            .route("/echo", post(|Json(v): Json<Value>| async move { Json(v) }))
            .route("/ping", get(|| async { "pong" }))
            .layer(axum::middleware::from_fn_with_state(auth, api_auth_middleware))
    }

    fn post_json(body: Value) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method("POST")
            .uri("/echo")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_disabled_auth_passes_through() {
        let response = app(ApiAuthState::disabled())
            .oneshot(post_json(json!({"name": "Ada"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_signed_body_accepted_and_body_restored() {
        let body = sign_body(json!({"name": "Ada"}), SECRET, crate::time::now_millis());
        let response = app(ApiAuthState::new(SECRET))
            .oneshot(post_json(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let echoed: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(echoed["name"], "Ada");
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let body = sign_body(json!({"name": "Ada"}), SECRET + 1, crate::time::now_millis());
        let response = app(ApiAuthState::new(SECRET))
            .oneshot(post_json(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_fields_is_bad_request() {
        let response = app(ApiAuthState::new(SECRET))
            .oneshot(post_json(json!({"name": "Ada"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_signed_query_accepted() {
        let timestamp = crate::time::now_millis();
        let value = json!({"timestamp": timestamp.to_string(), "hash": DUMMY_HASH});
        let hash = calculate_hash(&value, SECRET);

        let request = axum::http::Request::builder()
            .uri(format!("/ping?timestamp={}&hash={}", timestamp, hash))
            .body(Body::empty())
            .unwrap();
        let response = app(ApiAuthState::new(SECRET)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stale_query_rejected() {
        let timestamp = crate::time::now_millis() - 120_000;
        let value = json!({"timestamp": timestamp.to_string(), "hash": DUMMY_HASH});
        let hash = calculate_hash(&value, SECRET);

        let request = axum::http::Request::builder()
            .uri(format!("/ping?timestamp={}&hash={}", timestamp, hash))
            .body(Body::empty())
            .unwrap();
        let response = app(ApiAuthState::new(SECRET)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
