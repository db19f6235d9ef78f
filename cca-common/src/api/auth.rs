//! Service API authentication via timestamp and hash validation
//!
//! Every protected request carries:
//! - `timestamp`: i64 Unix epoch milliseconds
//! - `hash`: SHA-256 (64 hex chars) over canonical JSON + shared secret
//!
//! POST/PUT/PATCH requests carry both fields in the JSON body; GET/DELETE
//! requests carry them in the query string, and the hash then covers the
//! query parameters as a JSON object of strings.
//!
//! The shared secret lives in the `settings` table under `api_shared_secret`.
//! A secret of 0 disables checking entirely.
//!
//! This module holds pure functions and database operations only; the axum
//! layer lives in [`super::middleware`].

use crate::db::settings::get_setting;
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

/// Placeholder substituted for the `hash` field before hashing
pub const DUMMY_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Accepted clock skew for request timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampWindow {
    /// How far in the past a timestamp may be
    pub max_past_ms: i64,
    /// How far in the future a timestamp may be (clock drift only)
    pub max_future_ms: i64,
}

impl Default for TimestampWindow {
    fn default() -> Self {
        Self {
            max_past_ms: 30_000,
            max_future_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiAuthError {
    #[error("Invalid timestamp: {reason}")]
    InvalidTimestamp {
        timestamp: i64,
        now: i64,
        reason: String,
    },

    #[error("Invalid hash")]
    InvalidHash { provided: String, calculated: String },

    #[error("Shared secret unavailable: {0}")]
    Secret(String),
}

const SHARED_SECRET_KEY: &str = "api_shared_secret";

/// Shared secret from `settings`, generated on first use
pub async fn load_shared_secret(db: &SqlitePool) -> Result<i64, ApiAuthError> {
    let stored = get_setting::<i64>(db, SHARED_SECRET_KEY)
        .await
        .map_err(|e| ApiAuthError::Secret(e.to_string()))?;
    match stored {
        Some(secret) => Ok(secret),
        None => initialize_shared_secret(db).await,
    }
}

/// Store a random non-zero secret unless one exists, then read it back
///
/// Services starting at the same moment all end up with the first writer's
/// value.
pub async fn initialize_shared_secret(db: &SqlitePool) -> Result<i64, ApiAuthError> {
    let candidate = std::iter::repeat_with(rand::random::<i64>)
        .find(|v| *v != 0)
        .unwrap_or(1);

    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(SHARED_SECRET_KEY)
        .bind(candidate.to_string())
        .execute(db)
        .await
        .map_err(|e| ApiAuthError::Secret(e.to_string()))?;

    get_setting::<i64>(db, SHARED_SECRET_KEY)
        .await
        .map_err(|e| ApiAuthError::Secret(e.to_string()))?
        .ok_or_else(|| ApiAuthError::Secret("secret missing after insert".to_string()))
}

/// Check a request timestamp against the local clock
pub fn validate_timestamp(timestamp: i64, window: TimestampWindow) -> Result<(), ApiAuthError> {
    validate_timestamp_at(timestamp, crate::time::now_millis(), window)
}

/// Same check with an explicit `now`
///
/// ```
/// use cca_common::api::auth::{validate_timestamp_at, TimestampWindow};
///
/// let window = TimestampWindow::default();
/// let now = 1_730_000_000_000;
///
/// assert!(validate_timestamp_at(now, now, window).is_ok());
/// assert!(validate_timestamp_at(now - 500, now, window).is_ok());
/// assert!(validate_timestamp_at(now - 60_000, now, window).is_err());
/// ```
pub fn validate_timestamp_at(
    timestamp: i64,
    now: i64,
    window: TimestampWindow,
) -> Result<(), ApiAuthError> {
    let age = now - timestamp;
    if age > window.max_past_ms {
        return Err(ApiAuthError::InvalidTimestamp {
            timestamp,
            now,
            reason: format!(
                "{}ms old, at most {}ms allowed",
                age, window.max_past_ms
            ),
        });
    }

    if -age > window.max_future_ms {
        return Err(ApiAuthError::InvalidTimestamp {
            timestamp,
            now,
            reason: format!(
                "{}ms ahead, at most {}ms allowed",
                -age, window.max_future_ms
            ),
        });
    }

    Ok(())
}

/// Hex SHA-256 of the canonical JSON (with `hash` zeroed) followed by the
/// decimal secret
///
/// # Examples
///
/// ```
/// use cca_common::api::auth::calculate_hash;
/// use serde_json::json;
///
/// let json = json!({
///     "email": "ada@example.com",
///     "timestamp": 1730000000000i64,
///     "hash": "dummy"
/// });
///
/// let hash = calculate_hash(&json, 123456789);
/// assert_eq!(hash.len(), 64);
/// ```
pub fn calculate_hash(json_value: &Value, shared_secret: i64) -> String {
    let mut value = json_value.clone();
    if let Some(obj) = value.as_object_mut() {
        obj.insert("hash".to_string(), Value::String(DUMMY_HASH.to_string()));
    }

    let canonical = to_canonical_json(&value);
    let to_hash = format!("{}{}", canonical, shared_secret);

    let mut hasher = Sha256::new();
    hasher.update(to_hash.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sorted keys, no whitespace
///
/// ```
/// use cca_common::api::auth::to_canonical_json;
/// use serde_json::json;
///
/// let json = json!({"z": 3, "a": 1, "m": 2});
/// assert_eq!(to_canonical_json(&json), r#"{"a":1,"m":2,"z":3}"#);
/// ```
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by_key(|(k, _)| *k);
            let items: Vec<String> = pairs
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), to_canonical_json(v)))
                .collect();
            format!("{{{}}}", items.join(","))
        }
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        // serde_json's Display escapes strings the same way clients do
        other => other.to_string(),
    }
}

/// Compare a client hash (case-insensitive hex) with the expected one
pub fn validate_hash(
    provided_hash: &str,
    json_value: &Value,
    shared_secret: i64,
) -> Result<(), ApiAuthError> {
    let calculated = calculate_hash(json_value, shared_secret);

    if !provided_hash.eq_ignore_ascii_case(&calculated) {
        return Err(ApiAuthError::InvalidHash {
            provided: provided_hash.to_string(),
            calculated,
        });
    }

    Ok(())
}

/// Attach `timestamp` and `hash` to a JSON body (client side helper)
///
/// Used by tests and by services calling each other.
pub fn sign_body(mut body: Value, shared_secret: i64, timestamp: i64) -> Value {
    if let Some(obj) = body.as_object_mut() {
        obj.insert("timestamp".to_string(), Value::from(timestamp));
        obj.insert("hash".to_string(), Value::String(DUMMY_HASH.to_string()));
    }
    let hash = calculate_hash(&body, shared_secret);
    if let Some(obj) = body.as_object_mut() {
        obj.insert("hash".to_string(), Value::String(hash));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_730_000_000_000;

    #[test]
    fn test_valid_timestamp_accepted() {
        let window = TimestampWindow::default();
        assert!(validate_timestamp_at(NOW, NOW, window).is_ok());
        assert!(validate_timestamp_at(NOW - 500, NOW, window).is_ok());
        assert!(validate_timestamp_at(NOW - 30_000, NOW, window).is_ok());
    }

    #[test]
    fn test_timestamp_too_old_rejected() {
        let window = TimestampWindow::default();
        assert!(validate_timestamp_at(NOW - 30_001, NOW, window).is_err());
    }

    #[test]
    fn test_timestamp_future_rejected() {
        let window = TimestampWindow::default();
        assert!(validate_timestamp_at(NOW + 1_000, NOW, window).is_ok());
        assert!(validate_timestamp_at(NOW + 1_001, NOW, window).is_err());
    }

    #[test]
    fn test_hash_calculation_algorithm() {
        let body = json!({
            "email": "ada@example.com",
            "timestamp": NOW,
            "hash": DUMMY_HASH
        });

        let hash = calculate_hash(&body, 123456789);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, calculate_hash(&body, 123456789));
        assert_ne!(hash, calculate_hash(&body, 987654321));
    }

    #[test]
    fn test_hash_ignores_provided_hash_value() {
        let a = json!({"timestamp": NOW, "hash": "abc"});
        let b = json!({"timestamp": NOW, "hash": "def"});
        assert_eq!(calculate_hash(&a, 42), calculate_hash(&b, 42));
    }

    #[test]
    fn test_canonical_json_sorting_nested() {
        let value = json!({"z": {"b": 2, "a": 1}, "a": [3, {"y": true, "x": null}]});
        assert_eq!(
            to_canonical_json(&value),
            r#"{"a":[3,{"x":null,"y":true}],"z":{"a":1,"b":2}}"#
        );
    }

    #[test]
    fn test_canonical_json_escapes_strings() {
        let value = json!({"msg": "say \"hi\"\n"});
        assert_eq!(to_canonical_json(&value), r#"{"msg":"say \"hi\"\n"}"#);
    }

    #[test]
    fn test_sign_body_validates() {
        let signed = sign_body(json!({"name": "Ada"}), 777, NOW);
        let hash = signed["hash"].as_str().unwrap().to_string();
        assert!(validate_hash(&hash, &signed, 777).is_ok());
        assert!(validate_hash(&hash, &signed, 778).is_err());
        assert_eq!(signed["timestamp"], json!(NOW));
    }

    #[test]
    fn test_invalid_hash_rejected() {
        let body = json!({"timestamp": NOW, "hash": "dummy"});
        assert!(validate_hash(DUMMY_HASH, &body, 123456789).is_err());
    }
}
