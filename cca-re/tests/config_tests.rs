//! LLM API key resolution order

use cca_common::config::TomlConfig;
use cca_common::db::init_database;
use cca_common::db::settings::set_setting;
use cca_re::config::{resolve_llm_api_key, LLM_API_KEY_ENV, LLM_API_KEY_SETTING};
use serial_test::serial;
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn setup() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("cca.db")).await.unwrap();
    (dir, pool)
}

fn toml_with_key(key: Option<&str>) -> TomlConfig {
    let mut config = TomlConfig::default();
    config.llm.api_key = key.map(str::to_string);
    config
}

#[tokio::test]
#[serial]
async fn test_database_key_wins() {
    let (_dir, pool) = setup().await;
    set_setting(&pool, LLM_API_KEY_SETTING, "db-key").await.unwrap();
    std::env::set_var(LLM_API_KEY_ENV, "env-key");

    let key = resolve_llm_api_key(&pool, &toml_with_key(Some("toml-key"))).await.unwrap();
    std::env::remove_var(LLM_API_KEY_ENV);
    assert_eq!(key.as_deref(), Some("db-key"));
}

#[tokio::test]
#[serial]
async fn test_environment_beats_toml() {
    let (_dir, pool) = setup().await;
    std::env::set_var(LLM_API_KEY_ENV, "env-key");

    let key = resolve_llm_api_key(&pool, &toml_with_key(Some("toml-key"))).await.unwrap();
    std::env::remove_var(LLM_API_KEY_ENV);
    assert_eq!(key.as_deref(), Some("env-key"));
}

#[tokio::test]
#[serial]
async fn test_toml_fallback_and_blank_values() {
    let (_dir, pool) = setup().await;
    std::env::set_var(LLM_API_KEY_ENV, "   ");

    let key = resolve_llm_api_key(&pool, &toml_with_key(Some(" toml-key "))).await.unwrap();
    std::env::remove_var(LLM_API_KEY_ENV);
    assert_eq!(key.as_deref(), Some("toml-key"));
}

#[tokio::test]
#[serial]
async fn test_no_key_configured() {
    let (_dir, pool) = setup().await;
    std::env::remove_var(LLM_API_KEY_ENV);

    let key = resolve_llm_api_key(&pool, &toml_with_key(None)).await.unwrap();
    assert!(key.is_none());
}
