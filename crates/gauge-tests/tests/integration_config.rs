// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Config Integration Tests
//!
//! Integration tests for configuration loading from real files on disk:
//! format detection, environment placeholders, fallback behavior, and
//! validation.
//!
//! ## Test Categories
//!
//! - `test_load_*`: file loading in every supported format
//! - `test_fallback_*`: behavior when the file is missing or broken
//! - `test_env_*`: environment variable placeholders
//! - `test_validation_*`: schema validation rules

use std::fs;

use gauge_config::{
    load_config, load_config_or_default, load_config_str, ConfigError, ConfigFormat,
    ConfigLoader, TagSettings, TagType, DEFAULT_MODBUS_PORT, DEFAULT_POLL_INTERVAL_MS,
};

use gauge_tests::common::{temp_test_dir, unique_test_id};
use gauge_tests::prelude::*;

// =============================================================================
// Load Tests
// =============================================================================

#[test]
fn test_load_yaml_file_covers_every_section() {
    let dir = temp_test_dir("gauge-config");
    let path = dir.path().join("gauge.yaml");
    fs::write(&path, ConfigFixtures::yaml_full()).unwrap();

    let config = load_config(&path).assert_ok();

    assert_eq!(config.modbus.host, "10.0.0.5");
    assert_eq!(config.modbus.port, 1502);
    assert_eq!(config.modbus.unit_id, 3);
    assert!(config.modbus.auto_reconnect);
    assert_eq!(config.modbus.reconnect_delay_secs, 2);
    assert_eq!(config.modbus.connect_timeout_ms, 2000);
    assert_eq!(config.modbus.operation_timeout_ms, 1500);
    assert_eq!(config.poller.poll_interval_ms, 250);

    assert_eq!(config.tags.len(), 4);

    let temperature = &config.tags["temperature"];
    assert_eq!(temperature.address, 100);
    assert_eq!(temperature.tag_type, TagType::HoldingRegister);
    assert_eq!(temperature.scaling, 0.1);
    assert_eq!(temperature.unit.as_deref(), Some("°C"));
    assert!(temperature.polled);

    let motor = &config.tags["motor_running"];
    assert_eq!(motor.tag_type, TagType::Coil);
    assert!(motor.tag_type.is_bit());

    assert!(!config.tags["setpoint"].polled);
}

#[test]
fn test_load_toml_and_json_files() {
    let dir = temp_test_dir("gauge-config");

    let toml_path = dir.path().join("gauge.toml");
    fs::write(&toml_path, ConfigFixtures::toml_sample()).unwrap();
    let config = load_config(&toml_path).assert_ok();
    assert_eq!(config.modbus.host, "10.0.0.6");
    assert_eq!(config.modbus.unit_id, 2);
    assert_eq!(config.poller.poll_interval_ms, 500);
    assert_eq!(config.tags.len(), 2);
    assert_eq!(config.tags["temperature"].unit.as_deref(), Some("°C"));

    let json_path = dir.path().join("gauge.json");
    fs::write(&json_path, ConfigFixtures::json_sample()).unwrap();
    let config = load_config(&json_path).assert_ok();
    assert_eq!(config.modbus.host, "10.0.0.7");
    assert_eq!(config.modbus.unit_id, 4);
    assert_eq!(config.poller.poll_interval_ms, 2000);
    assert_eq!(config.tags["pressure"].scaling, 0.01);
}

#[test]
fn test_load_minimal_file_keeps_field_defaults_and_empty_tags() {
    let dir = temp_test_dir("gauge-config");
    let path = dir.path().join("minimal.yml");
    fs::write(&path, ConfigFixtures::yaml_minimal()).unwrap();

    let config = load_config(&path).assert_ok();

    assert_eq!(config.modbus.host, "192.168.1.20");
    assert_eq!(config.modbus.port, DEFAULT_MODBUS_PORT);
    assert_eq!(config.poller.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);

    // A present file with no tag table means "no tags", not the
    // built-in demo table.
    assert!(config.tags.is_empty());
}

#[test]
fn test_load_unsupported_extension_is_rejected() {
    let dir = temp_test_dir("gauge-config");
    let path = dir.path().join("gauge.ini");
    fs::write(&path, "host=10.0.0.1").unwrap();

    let err = load_config(&path).assert_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat { ref format } if format == "ini"));
}

#[test]
fn test_load_unknown_top_level_field_is_a_parse_error() {
    let err = load_config_str("network:\n  port: 9\n", ConfigFormat::Yaml).assert_err();
    match err {
        ConfigError::Parse { message, .. } => {
            assert!(message.contains("network"), "message was: {}", message)
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
}

// =============================================================================
// Fallback Tests
// =============================================================================

#[test]
fn test_fallback_missing_file_yields_demo_defaults() {
    let dir = temp_test_dir("gauge-config");
    let path = dir.path().join("does-not-exist.yaml");

    let err = load_config(&path).assert_err();
    assert!(matches!(err, ConfigError::NotFound { .. }));

    let config = load_config_or_default(&path).assert_ok();
    assert_eq!(config.modbus.host, "127.0.0.1");
    assert_eq!(config.tags.len(), 3);
    assert!(config.tags.contains_key("temperature"));
    assert!(config.tags.contains_key("pressure"));
    assert!(config.tags.contains_key("motor_running"));
}

#[test]
fn test_fallback_covers_malformed_but_not_invalid_content() {
    let dir = temp_test_dir("gauge-config");

    // Unparseable file: degrade to defaults and keep running.
    let malformed = dir.path().join("broken.yaml");
    fs::write(&malformed, ConfigFixtures::yaml_malformed()).unwrap();
    let config = load_config_or_default(&malformed).assert_ok();
    assert_eq!(config.tags.len(), 3);

    // Parseable file with invalid content: surface the error, because
    // silently dropping an explicit (if wrong) setup hides real
    // mistakes.
    let invalid = dir.path().join("invalid.yaml");
    fs::write(&invalid, ConfigFixtures::yaml_zero_scaling()).unwrap();
    let err = load_config_or_default(&invalid).assert_err();
    match err {
        ConfigError::Validation { field, .. } => {
            assert!(field.contains("scaling"), "field was: {}", field)
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
}

// =============================================================================
// Environment Placeholder Tests
// =============================================================================

#[test]
fn test_env_placeholder_resolves_from_process_environment() {
    let var = format!("GAUGE_{}", unique_test_id().to_uppercase());
    let doc = ConfigFixtures::yaml_with_env_host(&var);

    // Unset: the inline fallback applies.
    let config = load_config_str(&doc, ConfigFormat::Yaml).assert_ok();
    assert_eq!(config.modbus.host, "fallback.local");

    // Set: the process environment wins.
    std::env::set_var(&var, "plc.factory.local");
    let config = load_config_str(&doc, ConfigFormat::Yaml).assert_ok();
    assert_eq!(config.modbus.host, "plc.factory.local");
    std::env::remove_var(&var);
}

#[test]
fn test_env_placeholder_kept_verbatim_when_resolution_disabled() {
    let var = format!("GAUGE_{}", unique_test_id().to_uppercase());
    let doc = format!("modbus:\n  host: \"${{{}:quoted.host}}\"\n", var);

    let loader = ConfigLoader::new().with_env_vars(false);
    let config = loader
        .load_from_str(&doc, ConfigFormat::Yaml)
        .assert_ok();
    assert_eq!(config.modbus.host, format!("${{{}:quoted.host}}", var));
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_validation_rejects_out_of_range_settings() {
    let err = GaugeConfigBuilder::new()
        .poll_interval_ms(0)
        .build()
        .validate()
        .assert_err();
    assert!(matches!(err, ConfigError::OutOfRange { ref field, .. } if field.contains("poll_interval")));

    let err = GaugeConfigBuilder::new()
        .reconnect_delay_secs(0)
        .build()
        .validate()
        .assert_err();
    assert!(matches!(err, ConfigError::OutOfRange { ref field, .. } if field.contains("reconnect_delay")));
}

#[test]
fn test_validation_rejects_tags_past_the_address_space() {
    let err = GaugeConfigBuilder::new()
        .tag(
            "wide",
            TagSettings {
                address: 65535,
                tag_type: TagType::HoldingRegister,
                length: 2,
                scaling: 1.0,
                unit: None,
                polled: true,
            },
        )
        .build()
        .validate()
        .assert_err();

    match err {
        ConfigError::Validation { message, .. } => {
            assert!(message.contains("address space"), "message was: {}", message)
        }
        other => panic!("expected a validation error, got {:?}", other),
    }

    // The very last register is still addressable.
    GaugeConfigBuilder::new()
        .word_tag("last", 65535)
        .build()
        .validate()
        .assert_ok();
}

#[test]
fn test_validation_accepts_builder_round_trip() {
    let config = GaugeConfigBuilder::new()
        .host("10.1.1.1")
        .port(1502)
        .unit_id(7)
        .poll_interval_ms(200)
        .scaled_tag("temperature", 100, 0.1, "°C")
        .coil_tag("motor", 0)
        .unpolled_tag("setpoint", 300)
        .build_valid();

    assert_eq!(config.tags.len(), 3);
    assert_eq!(config.modbus.unit_id, 7);
}
