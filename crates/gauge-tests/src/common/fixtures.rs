// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built test data: tags, registries, device contents, and
//! configuration documents.
//!
//! Fixtures mirror the built-in demo tag table (a temperature, a
//! pressure, and a motor-running coil) so integration tests exercise the
//! same shapes the binary ships with.

use std::sync::Arc;

use gauge_core::{Region, Tag, TagRegistry};

use super::mocks::MockTransport;

// =============================================================================
// Tag Fixtures
// =============================================================================

/// Pre-built tags covering every region and value shape.
pub struct TagFixtures;

impl TagFixtures {
    /// Temperature: holding register 100, 0.1 °C per count.
    pub fn temperature() -> Tag {
        Tag::new("temperature", Region::HoldingRegister, 100)
            .with_scale(0.1)
            .with_unit("°C")
    }

    /// Pressure: holding register 101, 0.01 bar per count.
    pub fn pressure() -> Tag {
        Tag::new("pressure", Region::HoldingRegister, 101)
            .with_scale(0.01)
            .with_unit("bar")
    }

    /// Motor running: coil 0.
    pub fn motor_running() -> Tag {
        Tag::new("motor_running", Region::Coil, 0)
    }

    /// The demo tag table shipped as the built-in default.
    pub fn demo_tags() -> Vec<Tag> {
        vec![
            Self::temperature(),
            Self::pressure(),
            Self::motor_running(),
        ]
    }

    /// Speed setpoint: holding register 300, not polled. A pure write
    /// target.
    pub fn setpoint() -> Tag {
        Tag::new("setpoint", Region::HoldingRegister, 300).with_polled(false)
    }

    /// Recipe block: four holding registers at 400, not polled. A
    /// multi-word write target.
    pub fn recipe_block() -> Tag {
        Tag::new("recipe_block", Region::HoldingRegister, 400)
            .with_length(4)
            .with_polled(false)
    }

    /// Alarm contact: discrete input 10 (read-only).
    pub fn alarm_contact() -> Tag {
        Tag::new("alarm_contact", Region::DiscreteInput, 10)
    }

    /// Line speed: input register 5 (read-only), 0.1 m/s per count.
    pub fn line_speed() -> Tag {
        Tag::new("line_speed", Region::InputRegister, 5)
            .with_scale(0.1)
            .with_unit("m/s")
    }

    /// Everything above: the demo table plus write targets and
    /// read-only regions.
    pub fn plant_tags() -> Vec<Tag> {
        let mut tags = Self::demo_tags();
        tags.push(Self::setpoint());
        tags.push(Self::recipe_block());
        tags.push(Self::alarm_contact());
        tags.push(Self::line_speed());
        tags
    }

    /// Three adjacent holding registers at 200..=202. Their addresses
    /// are contiguous, so the poller covers all three with one read.
    pub fn flow_tags() -> Vec<Tag> {
        vec![
            Tag::new("flow_a", Region::HoldingRegister, 200),
            Tag::new("flow_b", Region::HoldingRegister, 201),
            Tag::new("flow_c", Region::HoldingRegister, 202),
        ]
    }
}

// =============================================================================
// Registry Fixtures
// =============================================================================

/// Pre-built tag registries.
pub struct RegistryFixtures;

impl RegistryFixtures {
    /// Registry over the demo tag table.
    pub fn demo() -> Arc<TagRegistry> {
        Arc::new(TagRegistry::new(TagFixtures::demo_tags()).expect("demo tags are valid"))
    }

    /// Registry over the full plant tag set.
    pub fn plant() -> Arc<TagRegistry> {
        Arc::new(TagRegistry::new(TagFixtures::plant_tags()).expect("plant tags are valid"))
    }

    /// Registry whose polled tags form a single contiguous batch.
    pub fn contiguous() -> Arc<TagRegistry> {
        Arc::new(TagRegistry::new(TagFixtures::flow_tags()).expect("flow tags are valid"))
    }
}

// =============================================================================
// Device Fixtures
// =============================================================================

/// Raw register contents matching the demo tag table.
pub struct DeviceFixtures;

impl DeviceFixtures {
    /// Raw temperature word: 235 counts, scaling to 23.5 °C.
    pub const TEMPERATURE_RAW: u16 = 235;

    /// Raw pressure word: 1013 counts, scaling to 10.13 bar.
    pub const PRESSURE_RAW: u16 = 1013;

    /// Motor running state.
    pub const MOTOR_RUNNING: bool = true;

    /// Seed a mock device with the demo register contents.
    pub async fn seed_demo(mock: &MockTransport) {
        mock.set_word(Region::HoldingRegister, 100, Self::TEMPERATURE_RAW)
            .await;
        mock.set_word(Region::HoldingRegister, 101, Self::PRESSURE_RAW)
            .await;
        mock.set_bit(Region::Coil, 0, Self::MOTOR_RUNNING).await;
    }

    /// Seed the read-only regions used by the plant tag set.
    pub async fn seed_plant_inputs(mock: &MockTransport) {
        mock.set_bit(Region::DiscreteInput, 10, true).await;
        mock.set_word(Region::InputRegister, 5, 87).await;
    }
}

// =============================================================================
// Config Fixtures
// =============================================================================

/// Pre-built configuration documents in every supported format.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// A complete YAML document: device settings, poller settings, and a
    /// tag table covering scaled words, a plain word, and a coil.
    pub fn yaml_full() -> &'static str {
        r#"
modbus:
  host: 10.0.0.5
  port: 1502
  unit_id: 3
  auto_reconnect: true
  reconnect_delay_secs: 2
  connect_timeout_ms: 2000
  operation_timeout_ms: 1500

poller:
  poll_interval_ms: 250

tags:
  temperature:
    address: 100
    type: holding_register
    scaling: 0.1
    unit: "°C"
  pressure:
    address: 101
    type: holding_register
    scaling: 0.01
    unit: bar
  motor_running:
    address: 0
    type: coil
  setpoint:
    address: 300
    type: holding_register
    polled: false
"#
    }

    /// A YAML document with only a device host. Everything else falls
    /// back to its per-field default; the tag table is empty, not the
    /// built-in demo table.
    pub fn yaml_minimal() -> &'static str {
        "modbus:\n  host: 192.168.1.20\n"
    }

    /// The full document expressed in TOML.
    pub fn toml_sample() -> &'static str {
        r#"
[modbus]
host = "10.0.0.6"
port = 502
unit_id = 2

[poller]
poll_interval_ms = 500

[tags.temperature]
address = 100
type = "holding_register"
scaling = 0.1
unit = "°C"

[tags.motor_running]
address = 0
type = "coil"
"#
    }

    /// The full document expressed in JSON.
    pub fn json_sample() -> &'static str {
        r#"{
  "modbus": { "host": "10.0.0.7", "unit_id": 4 },
  "poller": { "poll_interval_ms": 2000 },
  "tags": {
    "pressure": { "address": 101, "type": "holding_register", "scaling": 0.01, "unit": "bar" }
  }
}"#
    }

    /// A YAML document whose host comes from an environment placeholder
    /// with a fallback default.
    pub fn yaml_with_env_host(var: &str) -> String {
        format!("modbus:\n  host: ${{{}:fallback.local}}\n", var)
    }

    /// Structurally valid YAML carrying a zero scaling factor, which
    /// must be rejected by validation rather than silently defaulted.
    pub fn yaml_zero_scaling() -> &'static str {
        "tags:\n  broken:\n    address: 5\n    type: holding_register\n    scaling: 0.0\n"
    }

    /// YAML that does not parse at all.
    pub fn yaml_malformed() -> &'static str {
        "modbus: [unclosed\n"
    }
}
