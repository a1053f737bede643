//! Configuration resolution tests
//!
//! Tests touching TOS_* environment variables are #[serial] so they never
//! observe each other's values.

use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tos_common::config::{
    default_root_folder, resolve_config_path, resolve_llm_api_key, resolve_root_folder, TomlConfig,
    ENV_CONFIG, ENV_ROOT_FOLDER,
};

fn clear_env() {
    env::remove_var(ENV_ROOT_FOLDER);
    env::remove_var(ENV_CONFIG);
    env::remove_var("TOS_LLM_API_KEY");
    env::remove_var("ANTHROPIC_API_KEY");
}

#[test]
fn test_missing_toml_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = TomlConfig::load(&temp_dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, TomlConfig::default());
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.worker.queue_capacity, 256);
    assert_eq!(config.trust.new_content_hours, 24.0);
}

#[test]
fn test_partial_toml_keeps_other_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tos.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/tos"

[gov]
port = 6000

[urgency]
manual_report = 10.0

[trust.high]
min_votes = 8
min_replies = 4
min_sp = 15
"#,
    )
    .unwrap();

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/tos")));
    assert_eq!(config.gov.port, Some(6000));
    assert_eq!(config.gov.host, "127.0.0.1");
    assert_eq!(config.bridge.port, None);
    assert_eq!(config.urgency.manual_report, 10.0);
    assert_eq!(config.urgency.multiple_concerns, 70.0);
    assert_eq!(config.trust.high.min_sp, 15);
    assert_eq!(config.trust.medium.min_sp, 5);
    assert_eq!(config.llm.timeout_secs, 30);
}

#[test]
fn test_malformed_toml_is_config_error() {
    let err = TomlConfig::from_toml_str("root_folder = [").unwrap_err();
    assert!(matches!(err, tos_common::Error::Config(_)));
}

#[test]
fn test_negative_threshold_rejected_at_load() {
    let err = TomlConfig::from_toml_str("[trust.low]\nmin_votes = -1\nmin_replies = 1\n").unwrap_err();
    assert!(matches!(err, tos_common::Error::Validation(_)));
}

#[test]
#[serial]
fn test_root_folder_priority_order() {
    clear_env();
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    assert_eq!(resolve_root_folder(None, &TomlConfig::default()), default_root_folder());
    assert_eq!(resolve_root_folder(None, &toml), PathBuf::from("/from/toml"));

    env::set_var(ENV_ROOT_FOLDER, "/from/env");
    assert_eq!(resolve_root_folder(None, &toml), PathBuf::from("/from/env"));

    let cli = Path::new("/from/cli");
    assert_eq!(resolve_root_folder(Some(cli), &toml), PathBuf::from("/from/cli"));

    clear_env();
}

#[test]
#[serial]
fn test_config_path_from_env() {
    clear_env();
    env::set_var(ENV_CONFIG, "/tmp/tos-test.toml");
    assert_eq!(resolve_config_path(None), PathBuf::from("/tmp/tos-test.toml"));
    assert_eq!(
        resolve_config_path(Some(Path::new("/cli.toml"))),
        PathBuf::from("/cli.toml")
    );
    clear_env();
}

#[test]
#[serial]
fn test_llm_key_env_beats_toml() {
    clear_env();
    let mut toml = TomlConfig::default();
    assert_eq!(resolve_llm_api_key(&toml), None);

    toml.llm.api_key = Some("toml-key".to_string());
    assert_eq!(resolve_llm_api_key(&toml), Some("toml-key".to_string()));

    env::set_var("ANTHROPIC_API_KEY", "anthropic-key");
    assert_eq!(resolve_llm_api_key(&toml), Some("anthropic-key".to_string()));

    env::set_var("TOS_LLM_API_KEY", "tos-key");
    assert_eq!(resolve_llm_api_key(&toml), Some("tos-key".to_string()));

    clear_env();
}

#[test]
#[serial]
fn test_blank_llm_key_is_ignored() {
    clear_env();
    env::set_var("TOS_LLM_API_KEY", "   ");
    let mut toml = TomlConfig::default();
    toml.llm.api_key = Some("".to_string());
    assert_eq!(resolve_llm_api_key(&toml), None);
    clear_env();
}
