//! Loading the engine configuration from files and environment variables

use std::fs;

use serial_test::serial;
use tempfile::TempDir;
use workitem_config::{ConfigError, ConfigProvider, EngineConfig};

fn clear_env() {
    std::env::remove_var("WORKITEM_API_BASE_URL");
    std::env::remove_var("WORKITEM_CODEBASE__STACK_ID");
    std::env::remove_var("WORKITEM_CODEBASE__KIND");
}

#[test]
#[serial]
fn test_defaults_without_sources() {
    clear_env();
    let config = ConfigProvider::new().load().unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
#[serial]
fn test_toml_file_overrides_defaults() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.toml");
    fs::write(
        &path,
        concat!(
            "api_base_url = \"https://wit.example.com/api\"\n\n",
            "[codebase]\nstack_id = \"rust-fedora\"\n",
        ),
    )
    .unwrap();

    let config = ConfigProvider::new().with_file(&path).load().unwrap();
    assert_eq!(config.api_base_url, "https://wit.example.com/api");
    assert_eq!(config.codebase.stack_id, "rust-fedora");
    assert_eq!(config.codebase.kind, "git");
}

#[test]
#[serial]
fn test_yaml_file_is_supported() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.yaml");
    fs::write(&path, "codebase:\n  kind: hg\n").unwrap();

    let config = ConfigProvider::new().with_file(&path).load().unwrap();
    assert_eq!(config.codebase.kind, "hg");
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.json");
    fs::write(&path, r#"{"api_base_url": "https://file.example.com/api"}"#).unwrap();

    std::env::set_var("WORKITEM_API_BASE_URL", "https://env.example.com/api");
    std::env::set_var("WORKITEM_CODEBASE__STACK_ID", "node-alpine");
    let result = ConfigProvider::new().with_file(&path).load();
    clear_env();

    let config = result.unwrap();
    assert_eq!(config.api_base_url, "https://env.example.com/api");
    assert_eq!(config.codebase.stack_id, "node-alpine");
}

#[test]
#[serial]
fn test_missing_file_is_reported() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let err = ConfigProvider::new()
        .with_file(dir.path().join("absent.toml"))
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));
}

#[test]
#[serial]
fn test_unknown_extension_is_rejected() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.ini");
    fs::write(&path, "api_base_url=x").unwrap();
    let err = ConfigProvider::new().with_file(&path).load().unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat { ref format } if format == "ini"));
}

#[test]
#[serial]
fn test_invalid_base_url_fails_validation() {
    clear_env();
    std::env::set_var("WORKITEM_API_BASE_URL", "not a url");
    let result = ConfigProvider::new().load();
    clear_env();
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}
