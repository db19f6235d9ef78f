//! Authentication flows
//!
//! Registration, email one-time codes and the access/refresh token pair
//! lifecycle. Handlers in `api::auth` are thin wrappers around these.

use crate::db::tokens::NewPair;
use crate::db::{otps, tokens, users};
use crate::db::users::User;
use crate::otp_sink::OtpSink;
use crate::secrets::{generate_otp_code, generate_token, hash_otp, hash_token, OTP_DIGITS};
use cca_common::api::{ApiError, ApiResult};
use cca_common::db::settings;
use cca_common::time::now;
use cca_common::validation::{is_valid_email, normalize_email};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Credentials returned to the client exactly once
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Refresh token lifetime in seconds
    pub refresh_expires_in: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OtpIssued {
    pub email: String,
    pub expires_in_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Introspection {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Introspection {
    fn inactive() -> Self {
        Self {
            active: false,
            user_id: None,
            email: None,
            expires_at: None,
        }
    }
}

fn checked_email(raw: &str) -> ApiResult<String> {
    let email = normalize_email(raw);
    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest(format!("Invalid email address: {}", raw.trim())));
    }
    Ok(email)
}

/// Create an account; 409 when the email is taken (case-insensitive)
pub async fn register(pool: &SqlitePool, email: &str, name: Option<&str>) -> ApiResult<User> {
    let email = checked_email(email)?;
    let name = name.map(str::trim).filter(|n| !n.is_empty());

    let user = users::insert_user(pool, &email, name, false).await?;
    info!(user_id = %user.id, "User registered");
    Ok(user)
}

/// Issue and deliver a one-time login code
///
/// A new code is refused while the previous one is younger than the resend
/// cooldown. Issuing a code retires any outstanding one.
pub async fn request_otp(pool: &SqlitePool, sink: &dyn OtpSink, email: &str) -> ApiResult<OtpIssued> {
    let email = checked_email(email)?;
    let cooldown = settings::otp_resend_cooldown(pool).await?;
    let ttl = settings::otp_ttl(pool).await?;
    let current = now();

    if let Some(previous) = otps::latest_for_email(pool, &email).await? {
        let elapsed = (current - previous.created_at).num_milliseconds().max(0) as u64;
        let cooldown_ms = cooldown.as_millis() as u64;
        if elapsed < cooldown_ms {
            let retry_after_secs = (cooldown_ms - elapsed).div_ceil(1000).max(1);
            return Err(ApiError::TooManyRequests {
                message: format!("A code was sent recently; retry in {}s", retry_after_secs),
                retry_after_secs,
            });
        }
    }

    let code = generate_otp_code();
    let expires_at = current + to_chrono(ttl);
    otps::replace_active(pool, &email, &hash_otp(&email, &code), expires_at).await?;
    sink.deliver(&email, &code)?;

    info!(email = %email, "One-time code requested");
    Ok(OtpIssued {
        email,
        expires_in_seconds: ttl.as_secs(),
    })
}

/// Check a one-time code and log the user in
///
/// Success consumes the code, creates the account on first login and issues
/// a fresh token pair.
pub async fn verify_otp(pool: &SqlitePool, email: &str, code: &str) -> ApiResult<(User, TokenPair)> {
    let email = checked_email(email)?;
    let code = code.trim();
    if code.len() != OTP_DIGITS || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::BadRequest(format!("Code must be {} digits", OTP_DIGITS)));
    }

    let record = otps::latest_for_email(pool, &email)
        .await?
        .filter(|r| !r.consumed)
        .ok_or_else(|| ApiError::Unauthorized("No active code for this email".to_string()))?;

    if record.expires_at <= now() {
        return Err(ApiError::Unauthorized("Code expired; request a new one".to_string()));
    }

    let max_attempts = settings::otp_max_attempts(pool).await?;
    if record.attempts >= max_attempts {
        return Err(ApiError::TooManyRequests {
            message: "Too many attempts; request a new code".to_string(),
            retry_after_secs: 0,
        });
    }

    if hash_otp(&email, code) != record.code_hash {
        let attempts = otps::record_failed_attempt(pool, &record.id).await?;
        let remaining = max_attempts.saturating_sub(attempts);
        warn!(email = %email, attempts, "Invalid one-time code");
        return Err(ApiError::Unauthorized(format!(
            "Invalid code ({} attempts remaining)",
            remaining
        )));
    }

    if !otps::consume(pool, &record.id).await? {
        return Err(ApiError::Unauthorized("Code already used".to_string()));
    }

    let user = match users::find_by_email(pool, &email).await? {
        Some(user) => user,
        None => match users::insert_user(pool, &email, None, true).await {
            Ok(user) => user,
            // Registered concurrently between lookup and insert
            Err(cca_common::Error::Conflict(_)) => users::find_by_email(pool, &email)
                .await?
                .ok_or_else(|| ApiError::Internal("User lookup failed".to_string()))?,
            Err(e) => return Err(e.into()),
        },
    };

    if !user.is_active {
        return Err(ApiError::Unauthorized("Account disabled".to_string()));
    }

    users::record_login(pool, &user.id).await?;
    let pair = issue_tokens(pool, &user.id, None)
        .await?
        .ok_or_else(|| ApiError::Internal("Token issue failed".to_string()))?;

    let user = users::find_by_id(pool, &user.id).await?.unwrap_or(user);
    info!(user_id = %user.id, "User logged in");
    Ok((user, pair))
}

async fn issue_tokens(
    pool: &SqlitePool,
    user_id: &str,
    rotating_from: Option<&str>,
) -> ApiResult<Option<TokenPair>> {
    let access_ttl = settings::access_token_ttl(pool).await?;
    let refresh_ttl = settings::refresh_token_ttl(pool).await?;
    let issued_at = now();

    let access_token = generate_token();
    let refresh_token = generate_token();
    let access_hash = hash_token(&access_token);
    let refresh_hash = hash_token(&refresh_token);

    let pair = NewPair {
        access_token_hash: &access_hash,
        refresh_token_hash: &refresh_hash,
        access_expires_at: issued_at + to_chrono(access_ttl),
        refresh_expires_at: issued_at + to_chrono(refresh_ttl),
    };

    let issued = tokens::issue_pair(pool, user_id, pair, rotating_from).await?;
    Ok(issued.map(|_| TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer",
        expires_in: access_ttl.as_secs() as i64,
        refresh_expires_in: refresh_ttl.as_secs() as i64,
    }))
}

fn to_chrono(d: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::zero())
}

async fn reject_reuse(pool: &SqlitePool, user_id: &str) -> ApiError {
    match tokens::revoke_all_for_user(pool, user_id).await {
        Ok(revoked) => warn!(user_id = %user_id, revoked, "Refresh token reuse detected"),
        Err(e) => warn!(user_id = %user_id, error = %e, "Refresh token reuse detected; revoke failed"),
    }
    ApiError::Unauthorized("Refresh token reuse detected; all sessions revoked".to_string())
}

/// Exchange a refresh token for a new pair
///
/// Presenting a refresh token that was already rotated or revoked revokes
/// every pair of its user.
pub async fn refresh(pool: &SqlitePool, refresh_token: &str) -> ApiResult<TokenPair> {
    let record = tokens::find_by_refresh_hash(pool, &hash_token(refresh_token.trim()))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".to_string()))?;

    if record.revoked {
        return Err(reject_reuse(pool, &record.user_id).await);
    }

    if record.refresh_expires_at <= now() {
        return Err(ApiError::Unauthorized("Refresh token expired".to_string()));
    }

    let user = users::find_by_id(pool, &record.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".to_string()))?;
    if !user.is_active {
        return Err(ApiError::Unauthorized("Account disabled".to_string()));
    }

    match issue_tokens(pool, &record.user_id, Some(&record.id)).await? {
        Some(pair) => {
            info!(user_id = %record.user_id, "Token pair rotated");
            Ok(pair)
        }
        None => Err(reject_reuse(pool, &record.user_id).await),
    }
}

/// Revoke the pair holding `refresh_token`; unknown tokens are ignored
pub async fn logout(pool: &SqlitePool, refresh_token: &str) -> ApiResult<()> {
    if let Some(record) = tokens::find_by_refresh_hash(pool, &hash_token(refresh_token.trim())).await? {
        if tokens::revoke(pool, &record.id).await? {
            info!(user_id = %record.user_id, "User logged out");
        }
    }
    Ok(())
}

/// Report whether an access token is live and whom it belongs to
pub async fn introspect(pool: &SqlitePool, access_token: &str) -> ApiResult<Introspection> {
    let Some(record) = tokens::find_by_access_hash(pool, &hash_token(access_token.trim())).await? else {
        return Ok(Introspection::inactive());
    };

    if record.revoked || record.access_expires_at <= now() {
        return Ok(Introspection::inactive());
    }

    match users::find_by_id(pool, &record.user_id).await? {
        Some(user) if user.is_active => Ok(Introspection {
            active: true,
            user_id: Some(user.id),
            email: Some(user.email),
            expires_at: Some(record.access_expires_at),
        }),
        _ => Ok(Introspection::inactive()),
    }
}
