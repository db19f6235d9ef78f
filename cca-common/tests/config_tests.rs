//! Configuration loading and root folder resolution
//!
//! Tests that touch CCA_ROOT_FOLDER or CCA_CONFIG are #[serial] so they
//! never race on process environment.

use cca_common::config::{
    load_toml_config, load_toml_config_or_default, CacheBackendKind, CompiledDefaults,
    RootFolderInitializer, RootFolderResolver, TomlConfig, CONFIG_FILE_ENV, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var(ROOT_FOLDER_ENV);
    env::remove_var(CONFIG_FILE_ENV);
}

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();
    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert!(defaults.root_folder.ends_with("cca") || defaults.root_folder.ends_with("cca_data"));
    assert_eq!(defaults.log_level, "info");
}

#[test]
#[serial]
fn test_cli_arg_beats_env() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let resolved = RootFolderResolver::new("cca-test")
        .with_cli_arg(Some(PathBuf::from("/from/cli")))
        .resolve();
    clear_env();
    assert_eq!(resolved, PathBuf::from("/from/cli"));
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };
    let resolved = RootFolderResolver::new("cca-test").with_toml(toml).resolve();
    clear_env();
    assert_eq!(resolved, PathBuf::from("/from/env"));
}

#[test]
#[serial]
fn test_toml_beats_default() {
    clear_env();
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };
    let resolved = RootFolderResolver::new("cca-test").with_toml(toml).resolve();
    assert_eq!(resolved, PathBuf::from("/from/toml"));
}

#[test]
#[serial]
fn test_blank_env_is_ignored() {
    env::set_var(ROOT_FOLDER_ENV, "   ");
    let resolved = RootFolderResolver::new("cca-test")
        .with_toml(TomlConfig::default())
        .resolve();
    clear_env();
    assert_eq!(resolved, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_config_file_from_env_is_loaded() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "root_folder = \"/srv/cca\"\n[cache]\nbackend = \"memory\"\nmemory_capacity = 42\n",
    )
    .unwrap();

    env::set_var(CONFIG_FILE_ENV, &path);
    let config = load_toml_config_or_default();
    clear_env();

    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/cca")));
    assert_eq!(config.cache.backend, CacheBackendKind::Memory);
    assert_eq!(config.cache.memory_capacity, 42);
}

#[test]
#[serial]
fn test_malformed_config_falls_back_to_defaults() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "root_folder = [not valid").unwrap();

    assert!(load_toml_config(&path).is_err());

    env::set_var(CONFIG_FILE_ENV, &path);
    let config = load_toml_config_or_default();
    clear_env();

    assert!(config.root_folder.is_none());
}

#[test]
fn test_initializer_creates_directory() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("nested").join("root");
    let init = RootFolderInitializer::new(root.clone());
    init.ensure_directory_exists().unwrap();
    assert!(root.is_dir());
    assert_eq!(init.database_path(), root.join("cca.db"));
}
