//! Configuration loading and root folder resolution
//!
//! Two tiers, as every CCA service uses them:
//! 1. **TOML bootstrap**: root folder, logging, cache backend, LLM endpoint
//!    (read once at startup)
//! 2. **Database runtime**: everything else lives in the `settings` table
//!    (see [`crate::db::settings`])
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`CCA_ROOT_FOLDER`)
//! 3. TOML config file (`root_folder` key)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "CCA_ROOT_FOLDER";

/// Environment variable pointing at an explicit TOML config file
pub const CONFIG_FILE_ENV: &str = "CCA_CONFIG";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "cca.db";

/// Bootstrap configuration loaded from TOML
///
/// All fields are optional; a missing file yields `TomlConfig::default()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database file
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Cache backend configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// LLM endpoint used for AI insight generation
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Cache backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// Distributed cache shared by all services
    Redis,
    /// In-process cache (single instance)
    Memory,
    /// Caching disabled
    #[default]
    None,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackendKind,

    /// Redis connection URL (used when backend = "redis")
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Maximum entries for the in-process cache
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: u64,

    /// Default TTL in seconds
    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::None,
            redis_url: default_redis_url(),
            memory_capacity: default_memory_capacity(),
            default_ttl_seconds: default_ttl_seconds(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_memory_capacity() -> u64 {
    10_000
}

fn default_ttl_seconds() -> u64 {
    3600
}

/// LLM endpoint configuration (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key; may also come from `CCA_LLM_API_KEY` or the settings table
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            timeout_seconds: default_llm_timeout(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

/// OS-dependent compiled defaults
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: default_log_level(),
        }
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/cca (or /var/lib/cca for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("cca"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/cca"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("cca"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/cca"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("cca"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\cca"))
    } else {
        PathBuf::from("./cca_data")
    }
}

/// Locate the TOML config file for this platform
///
/// `CCA_CONFIG` wins; otherwise the user config dir, then `/etc/cca` on Linux.
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        return Some(PathBuf::from(path));
    }

    let user_config = dirs::config_dir().map(|d| d.join("cca").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/cca/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load bootstrap TOML from an explicit path
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load bootstrap TOML, falling back to defaults
///
/// A missing or malformed file never stops a service from starting.
pub fn load_toml_config_or_default() -> TomlConfig {
    let Some(path) = config_file_path() else {
        return TomlConfig::default();
    };

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{} - using compiled defaults", e);
            TomlConfig::default()
        }
    }
}

/// Resolves the root folder using the documented priority order
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml: Option<TomlConfig>,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_arg: None,
            toml: None,
        }
    }

    /// Command-line override (priority 1)
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Already-loaded TOML config (priority 3); loaded lazily otherwise
    pub fn with_toml(mut self, config: TomlConfig) -> Self {
        self.toml = Some(config);
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!(module = %self.module_name, "Root folder from command line: {}", path.display());
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                info!(module = %self.module_name, "Root folder from {}: {}", ROOT_FOLDER_ENV, path);
                return PathBuf::from(path);
            }
        }

        let toml_root = match &self.toml {
            Some(config) => config.root_folder.clone(),
            None => load_toml_config_or_default().root_folder,
        };
        if let Some(path) = toml_root {
            info!(module = %self.module_name, "Root folder from TOML: {}", path.display());
            return path;
        }

        let path = CompiledDefaults::for_current_platform().root_folder;
        info!(module = %self.module_name, "Root folder from compiled default: {}", path.display());
        path
    }
}

/// Creates the root folder and locates the database inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_defaults_when_sections_missing() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert!(config.root_folder.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.cache.backend, CacheBackendKind::None);
        assert_eq!(config.cache.default_ttl_seconds, 3600);
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_toml_full_config_parses() {
        let config: TomlConfig = toml::from_str(
            r#"
            root_folder = "/srv/cca"

            [logging]
            level = "debug"
            json = true

            [cache]
            backend = "redis"
            redis_url = "redis://cache:6379"

            [llm]
            api_key = "sk-test"
            model = "test-model"
            "#,
        )
        .unwrap();

        assert_eq!(config.root_folder, Some(PathBuf::from("/srv/cca")));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.cache.backend, CacheBackendKind::Redis);
        assert_eq!(config.cache.redis_url, "redis://cache:6379");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_initializer_database_path() {
        let init = RootFolderInitializer::new(PathBuf::from("/tmp/cca-root"));
        assert_eq!(init.database_path(), PathBuf::from("/tmp/cca-root/cca.db"));
    }
}
