//! Unit tests for configuration resolution and graceful degradation
//!
//! Covers:
//! - Missing config files never cause termination
//! - Priority order: CLI argument > XRTOUR_CONFIG > platform default > compiled defaults
//! - Malformed or invalid files are reported as errors
//!
//! Note: Uses serial_test to prevent ENV variable race conditions.
//! Tests that manipulate XRTOUR_CONFIG are marked with #[serial].

use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use xrtour_common::config::{resolve_config_path, PlayerConfig, CONFIG_ENV_VAR};
use xrtour_common::Error;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp config");
    file.write_all(content.as_bytes()).expect("Failed to write temp config");
    file
}

#[test]
#[serial]
fn test_cli_argument_wins_over_env_var() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/xrtour-env-config.toml");

    let cli = PathBuf::from("/tmp/xrtour-cli-config.toml");
    let resolved = resolve_config_path(Some(&cli));
    assert_eq!(resolved, Some(cli));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_argument() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/xrtour-env-config.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/xrtour-env-config.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);

    let missing = PathBuf::from("/tmp/xrtour-definitely-missing/config.toml");
    let config = PlayerConfig::load_or_default(Some(&missing)).expect("Missing file must not fail");
    assert_eq!(config, PlayerConfig::default());
}

#[test]
#[serial]
fn test_load_from_env_var_file() {
    let file = write_config(
        r#"
        [server]
        port = 6001

        [playback]
        fallback_sources = ["a.mp3", "b.mp3"]
        resume_delay_ms = 150
        "#,
    );
    env::set_var(CONFIG_ENV_VAR, file.path());

    let config = PlayerConfig::load_or_default(None).expect("Config should load");
    assert_eq!(config.server.port, 6001);
    assert_eq!(config.playback.fallback_sources, vec!["a.mp3", "b.mp3"]);
    assert_eq!(config.playback.resume_delay_ms, 150);
    // Untouched sections keep their defaults
    assert_eq!(config.sync.seek_settle_ms, 300);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_malformed_file_is_an_error() {
    let file = write_config("[server\nport = ");
    let result = PlayerConfig::load(file.path());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_invalid_values_are_an_error() {
    let file = write_config(
        r#"
        [sync]
        interval_ms = 0
        "#,
    );
    let result = PlayerConfig::load(file.path());
    assert!(result.is_err());
}

#[test]
fn test_default_config_round_trips_through_toml() {
    let config = PlayerConfig::default();
    let text = toml::to_string(&config).expect("Defaults should serialize");
    let parsed = PlayerConfig::from_toml_str(&text).expect("Serialized defaults should parse");
    assert_eq!(parsed, config);
}
