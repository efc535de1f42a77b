//! Integration tests for configuration resolution and graceful degradation
//!
//! Covers:
//! - Missing config file SHALL NOT cause termination
//! - Priority order for config file resolution (CLI > env > platform dir)
//! - Invalid explicitly named config files are reported
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate FOCUS_CONFIG are marked with #[serial].

use focus_common::config::{resolve_config_path, TomlConfig, CONFIG_ENV_VAR};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config_file() {
    let file = write_config(
        r#"
        [logging]
        level = "debug"

        [dispatcher]
        flush_timeout_ms = 500

        [events]
        capacity = 16
        "#,
    );

    let config = TomlConfig::load(file.path()).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.dispatcher.flush_timeout_ms, 500);
    assert_eq!(config.events.capacity, 16);
}

#[test]
fn test_missing_cli_file_falls_back_to_defaults() {
    let missing = PathBuf::from("/tmp/focus-arbiter-does-not-exist/config.toml");
    let config = TomlConfig::load_or_default(Some(&missing)).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_malformed_cli_file_is_an_error() {
    let file = write_config("[events\ncapacity = ");
    assert!(TomlConfig::load_or_default(Some(file.path())).is_err());
}

#[test]
#[serial]
fn test_env_var_used_without_cli_arg() {
    let file = write_config("[events]\ncapacity = 7\n");
    env::set_var(CONFIG_ENV_VAR, file.path());

    assert_eq!(resolve_config_path(None), Some(file.path().to_path_buf()));
    let config = TomlConfig::load_or_default(None).unwrap();
    assert_eq!(config.events.capacity, 7);

    // Cleanup
    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_cli_arg_takes_precedence_over_env() {
    let env_file = write_config("[events]\ncapacity = 7\n");
    let cli_file = write_config("[events]\ncapacity = 9\n");
    env::set_var(CONFIG_ENV_VAR, env_file.path());

    let config = TomlConfig::load_or_default(Some(cli_file.path())).unwrap();
    assert_eq!(config.events.capacity, 9);

    // Cleanup
    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_empty_env_var_ignored() {
    env::set_var(CONFIG_ENV_VAR, "");
    let resolved = resolve_config_path(None);
    if let Some(path) = resolved {
        // Only the platform config dir may answer, and only if it exists
        assert!(path.exists());
    }
    env::remove_var(CONFIG_ENV_VAR);
}
