// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for configuration loading and merging.

use parley_config::{load_config_from_path, load_config_from_str, ParleyConfig};
use serial_test::serial;

#[test]
fn defaults_are_sensible() {
    let config = ParleyConfig::default();
    assert_eq!(config.storage.database_path, "parley.db");
    assert_eq!(config.model.default_model, "claude-sonnet-4-20250514");
    assert_eq!(config.model.max_tokens, 4096);
    assert_eq!(config.chat.cancel_ttl_seconds, 60);
}

#[test]
fn toml_overrides_defaults() {
    let config = load_config_from_str(
        r#"
        [storage]
        database_path = "/var/lib/parley/parley.db"

        [model]
        max_tokens = 1024

        [chat]
        cancel_ttl_seconds = 30
        "#,
    )
    .unwrap();

    assert_eq!(config.storage.database_path, "/var/lib/parley/parley.db");
    assert_eq!(config.model.max_tokens, 1024);
    // Unset keys keep their defaults.
    assert_eq!(config.model.default_model, "claude-sonnet-4-20250514");
    assert_eq!(config.chat.cancel_ttl_seconds, 30);
}

#[test]
fn unknown_keys_are_rejected() {
    let result = load_config_from_str(
        r#"
        [model]
        defualt_model = "typo"
        "#,
    );
    assert!(result.is_err(), "unknown key should be rejected");
}

#[test]
#[serial]
fn env_vars_override_file_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parley.toml");
    std::fs::write(&path, "[model]\nmax_tokens = 512\n").unwrap();

    unsafe {
        std::env::set_var("PARLEY_MODEL_MAX_TOKENS", "2048");
    }
    let config = load_config_from_path(&path).unwrap();
    unsafe {
        std::env::remove_var("PARLEY_MODEL_MAX_TOKENS");
    }

    assert_eq!(config.model.max_tokens, 2048);
}

#[test]
#[serial]
fn env_var_maps_underscore_keys_correctly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parley.toml");
    std::fs::write(&path, "").unwrap();

    unsafe {
        std::env::set_var("PARLEY_STORAGE_DATABASE_PATH", "/tmp/other.db");
    }
    let config = load_config_from_path(&path).unwrap();
    unsafe {
        std::env::remove_var("PARLEY_STORAGE_DATABASE_PATH");
    }

    assert_eq!(config.storage.database_path, "/tmp/other.db");
}
