//! LLM API key resolution
//!
//! Priority: database setting `llm_api_key` → `CCA_LLM_API_KEY` → TOML
//! `[llm] api_key`.

use cca_common::config::TomlConfig;
use cca_common::db::settings::get_setting;
use cca_common::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

pub const LLM_API_KEY_SETTING: &str = "llm_api_key";
pub const LLM_API_KEY_ENV: &str = "CCA_LLM_API_KEY";

pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve the LLM API key; `None` leaves insight generation disabled
pub async fn resolve_llm_api_key(db: &SqlitePool, toml_config: &TomlConfig) -> Result<Option<String>> {
    let candidates = [
        ("database", get_setting::<String>(db, LLM_API_KEY_SETTING).await?),
        ("environment", std::env::var(LLM_API_KEY_ENV).ok()),
        ("TOML", toml_config.llm.api_key.clone()),
    ];

    let mut found = candidates
        .into_iter()
        .filter_map(|(source, key)| key.filter(|k| is_valid_key(k)).map(|k| (source, k)));

    let Some((source, key)) = found.next() else {
        return Ok(None);
    };
    let others: Vec<&str> = found.map(|(s, _)| s).collect();
    if !others.is_empty() {
        warn!(
            "LLM API key also set in {}; using {} (highest priority)",
            others.join(", "),
            source
        );
    }
    info!("LLM API key loaded from {}", source);
    Ok(Some(key.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_keys_invalid() {
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
        assert!(is_valid_key("sk-123"));
    }
}
