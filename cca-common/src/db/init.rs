//! Database initialization
//!
//! Every service opens the same SQLite file through `init_database`. Table
//! creation is idempotent, so whichever service starts first builds the
//! schema and seeds the assessment catalog.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

/// Open (creating if needed) the database and bring the schema up to date
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_settings_table(&pool).await?;

    // Identity
    create_users_table(&pool).await?;
    create_refresh_tokens_table(&pool).await?;
    create_email_otps_table(&pool).await?;

    // Assessment catalog
    create_tests_table(&pool).await?;
    create_test_sections_table(&pool).await?;
    create_test_dimensions_table(&pool).await?;
    create_questions_table(&pool).await?;
    create_options_table(&pool).await?;
    create_test_result_configurations_table(&pool).await?;

    // Per-user outcomes
    create_test_results_table(&pool).await?;
    create_ai_insights_table(&pool).await?;
    create_jobs_table(&pool).await?;

    create_contacts_table(&pool).await?;

    init_default_settings(&pool).await?;
    crate::db::seed::seed_catalog(&pool).await?;

    let timeout_ms: i64 = sqlx::query_scalar(
        "SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'database_busy_timeout_ms'",
    )
    .fetch_optional(&pool)
    .await?
    .unwrap_or(5000);

    sqlx::query(&format!("PRAGMA busy_timeout = {}", timeout_ms))
        .execute(&pool)
        .await?;

    info!("Database busy timeout set to {} ms", timeout_ms);

    Ok(pool)
}

/// Create the settings table
///
/// Stores runtime configuration key-value pairs (and the shared API secret).
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            email_verified INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            last_login_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// One row per issued token pair; only hashes are stored
async fn create_refresh_tokens_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS refresh_tokens (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            access_token_hash TEXT NOT NULL UNIQUE,
            refresh_token_hash TEXT NOT NULL UNIQUE,
            access_expires_at TEXT NOT NULL,
            refresh_expires_at TEXT NOT NULL,
            revoked INTEGER NOT NULL DEFAULT 0,
            revoked_at TEXT,
            replaced_by TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user ON refresh_tokens(user_id, revoked)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_email_otps_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS email_otps (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            code_hash TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0,
            consumed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_email_otps_email ON email_otps(email, created_at)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_tests_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tests (
            id INTEGER PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            estimated_minutes INTEGER NOT NULL DEFAULT 10,
            display_order INTEGER NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_test_sections_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS test_sections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            test_id INTEGER NOT NULL REFERENCES tests(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            display_order INTEGER NOT NULL,
            UNIQUE(test_id, display_order)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_test_dimensions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS test_dimensions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            test_id INTEGER NOT NULL REFERENCES tests(id) ON DELETE CASCADE,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            UNIQUE(test_id, code)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_questions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            test_id INTEGER NOT NULL REFERENCES tests(id) ON DELETE CASCADE,
            section_id INTEGER REFERENCES test_sections(id) ON DELETE SET NULL,
            text TEXT NOT NULL,
            display_order INTEGER NOT NULL,
            reverse_scored INTEGER NOT NULL DEFAULT 0,
            UNIQUE(test_id, display_order)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_options_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS options (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            question_id INTEGER NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
            text TEXT NOT NULL,
            dimension_code TEXT NOT NULL,
            score REAL NOT NULL,
            display_order INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_options_question ON options(question_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_test_result_configurations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS test_result_configurations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            test_id INTEGER NOT NULL REFERENCES tests(id) ON DELETE CASCADE,
            result_code TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            strengths TEXT NOT NULL DEFAULT '[]',
            career_suggestions TEXT NOT NULL DEFAULT '[]',
            UNIQUE(test_id, result_code)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// A retake replaces the previous row: (user_id, test_id) is unique
async fn create_test_results_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS test_results (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            test_id INTEGER NOT NULL REFERENCES tests(id),
            answers TEXT NOT NULL,
            scores TEXT NOT NULL,
            result_code TEXT NOT NULL,
            is_completed INTEGER NOT NULL DEFAULT 0,
            completed_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(user_id, test_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_ai_insights_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ai_insights (
            user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
            insights TEXT NOT NULL,
            model TEXT NOT NULL,
            job_id TEXT,
            generated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_jobs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            dedup_key TEXT NOT NULL,
            state TEXT NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0,
            max_retries INTEGER NOT NULL,
            payload TEXT,
            result TEXT,
            error TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            started_at TEXT,
            finished_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_user ON jobs(user_id, kind, state)")
        .execute(pool)
        .await?;

    // At most one unfinished job per user and dedup key
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_jobs_active_dedup ON jobs(user_id, dedup_key)
         WHERE state IN ('QUEUED', 'RUNNING', 'RETRYING')",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_contacts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contacts (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            subject TEXT NOT NULL,
            message TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_contacts_created ON contacts(created_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Ensure every runtime setting exists, writing defaults back
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "database_busy_timeout_ms", "5000").await?;

    // Cache TTLs
    ensure_setting(pool, "completion_cache_ttl_seconds", "300").await?;
    ensure_setting(pool, "questions_cache_ttl_seconds", "3600").await?;
    ensure_setting(pool, "insights_cache_ttl_seconds", "86400").await?;

    // Job queue
    ensure_setting(pool, "job_max_retries", "3").await?;
    ensure_setting(pool, "job_backoff_base_ms", "1000").await?;

    // Auth
    ensure_setting(pool, "otp_ttl_seconds", "600").await?;
    ensure_setting(pool, "otp_resend_cooldown_seconds", "60").await?;
    ensure_setting(pool, "otp_max_attempts", "5").await?;
    ensure_setting(pool, "access_token_ttl_seconds", "900").await?;
    ensure_setting(pool, "refresh_token_ttl_seconds", "2592000").await?; // 30 days

    // SSE
    ensure_setting(pool, "sse_heartbeat_interval_ms", "15000").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// A missing row is created; a NULL value is reset to the default.
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // OR IGNORE: several services may initialize concurrently
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}
