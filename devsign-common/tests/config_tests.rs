//! Tests for configuration resolution
//!
//! - Missing config files fall back to defaults
//! - TOML keys are parsed, partially specified files keep defaults
//! - Root folder priority: CLI > environment > TOML > default
//!
//! Tests that manipulate DEVSIGN_* variables are #[serial] so they never
//! observe each other's environment.

use devsign_common::config::{
    load_toml_config, resolve_config_path, resolve_root_folder, CliOverrides, ConfigSource,
    ServiceConfig,
    TomlConfig, UploadPolicy, CONFIG_ENV_VAR, DEFAULT_PORT, ROOT_FOLDER_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_missing_config_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let absent = dir.path().join("absent.toml");
    let (config, source) = load_toml_config(Some(&absent)).unwrap();

    assert_eq!(source, ConfigSource::Missing(absent));

    assert!(config.root_folder.is_none());
    assert!(config.port.is_none());
    assert_eq!(config.uploads, UploadPolicy::default());
}

#[test]
fn test_no_config_location_uses_defaults() {
    let (config, source) = load_toml_config(None).unwrap();
    assert_eq!(source, ConfigSource::Unresolved);
    assert_eq!(config.uploads, UploadPolicy::default());
}

#[test]
fn test_toml_config_parsed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("devsign-assembly.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/devsign"
port = 6100
max_upload_bytes = 1048576

[logging]
level = "debug"

[uploads]
document_extensions = ["pdf", "hwp"]
"#,
    )
    .unwrap();

    let (config, source) = load_toml_config(Some(&path)).unwrap();
    assert_eq!(source, ConfigSource::Loaded(path.clone()));
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/devsign")));
    assert_eq!(config.port, Some(6100));
    assert_eq!(config.max_upload_bytes, Some(1048576));
    assert_eq!(config.logging.level.as_deref(), Some("debug"));
    assert_eq!(config.uploads.document_extensions, vec!["pdf", "hwp"]);
    // Unspecified lists keep their defaults
    assert_eq!(config.uploads.primary_extensions, vec!["ppt", "pptx"]);
}

#[test]
fn test_malformed_toml_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "port = \"not a number\"").unwrap();

    let err = load_toml_config(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
#[serial]
fn test_root_folder_priority() {
    env::remove_var(ROOT_FOLDER_ENV_VAR);

    let cli = Path::new("/cli");
    let toml = Path::new("/toml");

    assert_eq!(resolve_root_folder(Some(cli), Some(toml)), PathBuf::from("/cli"));
    assert_eq!(resolve_root_folder(None, Some(toml)), PathBuf::from("/toml"));

    env::set_var(ROOT_FOLDER_ENV_VAR, "/env");
    assert_eq!(resolve_root_folder(Some(cli), Some(toml)), PathBuf::from("/cli"));
    assert_eq!(resolve_root_folder(None, Some(toml)), PathBuf::from("/env"));
    env::remove_var(ROOT_FOLDER_ENV_VAR);

    let fallback = resolve_root_folder(None, None);
    assert!(fallback.ends_with("devsign") || fallback.ends_with("devsign_data"));
}

#[test]
#[serial]
fn test_config_path_priority() {
    env::remove_var(CONFIG_ENV_VAR);
    assert_eq!(
        resolve_config_path(Some(Path::new("/explicit.toml"))),
        Some(PathBuf::from("/explicit.toml"))
    );

    env::set_var(CONFIG_ENV_VAR, "/from-env.toml");
    assert_eq!(resolve_config_path(None), Some(PathBuf::from("/from-env.toml")));
    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_service_config_defaults() {
    env::remove_var(ROOT_FOLDER_ENV_VAR);

    let config = ServiceConfig::resolve(CliOverrides::default(), TomlConfig::default());
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.bind_address, "127.0.0.1");
    assert!(config.log_level.is_none());
    assert!(config.database_path().ends_with("devsign.db"));
}

#[test]
fn test_ensure_directories_creates_upload_dir() {
    let dir = TempDir::new().unwrap();
    let cli = CliOverrides {
        root_folder: Some(dir.path().join("root")),
        ..Default::default()
    };
    let config = ServiceConfig::resolve(cli, TomlConfig::default());

    config.ensure_directories().unwrap();
    assert!(config.upload_dir().is_dir());
}
