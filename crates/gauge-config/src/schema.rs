// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema.
//!
//! Mirrors the on-disk layout of a `gauge.yaml` file. Every section has
//! serde defaults, so a partial file (or no file at all) always
//! deserializes into something usable. Validation is a separate step:
//! [`GaugeConfig::validate`] rejects values that parse but cannot work.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

// ============================================================================
// Defaults and limits
// ============================================================================

/// Default Modbus TCP port.
pub const DEFAULT_MODBUS_PORT: u16 = 502;

/// Default poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Minimum poll interval in milliseconds.
pub const MIN_POLL_INTERVAL_MS: u64 = 1;

/// Maximum poll interval in milliseconds (1 hour).
pub const MAX_POLL_INTERVAL_MS: u64 = 3_600_000;

/// Default delay between reconnect attempts in seconds.
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;

/// Minimum reconnect delay in seconds.
pub const MIN_RECONNECT_DELAY_SECS: u64 = 1;

/// Maximum reconnect delay in seconds (1 hour).
pub const MAX_RECONNECT_DELAY_SECS: u64 = 3600;

/// Default TCP connect timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// Default per-operation timeout in milliseconds.
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 3000;

/// Minimum timeout value in milliseconds.
pub const MIN_TIMEOUT_MS: u64 = 1;

/// Maximum timeout value in milliseconds (5 minutes).
pub const MAX_TIMEOUT_MS: u64 = 300_000;

/// Longest register block a single word tag may cover. Matches the
/// Modbus read-holding-registers request limit.
pub const MAX_WORD_TAG_LENGTH: u16 = 125;

// ============================================================================
// Tag types
// ============================================================================

/// The Modbus region a tag lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagType {
    /// Read/write single-bit output.
    Coil,
    /// Read-only single-bit input.
    DiscreteInput,
    /// Read/write 16-bit register.
    HoldingRegister,
    /// Read-only 16-bit register.
    InputRegister,
}

impl TagType {
    /// Returns `true` for the single-bit regions.
    pub fn is_bit(&self) -> bool {
        matches!(self, TagType::Coil | TagType::DiscreteInput)
    }

    /// Returns `true` if the region accepts writes.
    pub fn is_writable(&self) -> bool {
        matches!(self, TagType::Coil | TagType::HoldingRegister)
    }

    /// Longest block a tag of this type may cover. Bit tags are always
    /// single points; word tags may span a register block.
    pub fn max_length(&self) -> u16 {
        if self.is_bit() {
            1
        } else {
            MAX_WORD_TAG_LENGTH
        }
    }

    /// The name used in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            TagType::Coil => "coil",
            TagType::DiscreteInput => "discrete_input",
            TagType::HoldingRegister => "holding_register",
            TagType::InputRegister => "input_register",
        }
    }
}

impl std::fmt::Display for TagType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tag settings
// ============================================================================

/// One tag entry from the `tags` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagSettings {
    /// Zero-based address within the region.
    pub address: u16,

    /// Which Modbus region the tag reads from.
    #[serde(rename = "type")]
    pub tag_type: TagType,

    /// Number of consecutive points the tag covers.
    #[serde(default = "default_length")]
    pub length: u16,

    /// Multiplier applied to the raw value to produce the engineering
    /// value. `1.0` means the raw value is reported as-is.
    #[serde(default = "default_scaling")]
    pub scaling: f64,

    /// Display unit, e.g. `"°C"`.
    #[serde(default)]
    pub unit: Option<String>,

    /// Whether the background poller reads this tag.
    #[serde(default = "default_polled")]
    pub polled: bool,
}

fn default_length() -> u16 {
    1
}

fn default_scaling() -> f64 {
    1.0
}

fn default_polled() -> bool {
    true
}

impl TagSettings {
    /// Validates one tag entry. `name` is the map key, used in error
    /// messages.
    pub fn validate(&self, name: &str) -> ConfigResult<()> {
        if name.trim().is_empty() {
            return Err(ConfigError::validation("tags", "tag name must not be empty"));
        }
        if !self.scaling.is_finite() || self.scaling == 0.0 {
            return Err(ConfigError::validation(
                format!("tags.{name}.scaling"),
                "must be a finite non-zero number",
            ));
        }
        let max_length = self.tag_type.max_length();
        if self.length < 1 || self.length > max_length {
            return Err(ConfigError::out_of_range(
                format!("tags.{name}.length"),
                self.length,
                1,
                max_length,
            ));
        }
        let end = u32::from(self.address) + u32::from(self.length);
        if end > 65536 {
            return Err(ConfigError::validation(
                format!("tags.{name}.address"),
                format!(
                    "block {}..{} exceeds the 16-bit address space",
                    self.address, end
                ),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Modbus settings
// ============================================================================

/// The `modbus` section: where the device is and how patiently to talk
/// to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModbusSettings {
    /// Device hostname or IP address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Device TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Modbus unit identifier.
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,

    /// Whether to keep retrying after a lost connection.
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,

    /// Delay between reconnect attempts, in seconds.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// TCP connect timeout, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Per-request timeout, in milliseconds.
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_MODBUS_PORT
}

fn default_unit_id() -> u8 {
    1
}

fn default_auto_reconnect() -> bool {
    true
}

fn default_reconnect_delay_secs() -> u64 {
    DEFAULT_RECONNECT_DELAY_SECS
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_operation_timeout_ms() -> u64 {
    DEFAULT_OPERATION_TIMEOUT_MS
}

impl Default for ModbusSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            unit_id: default_unit_id(),
            auto_reconnect: default_auto_reconnect(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            connect_timeout_ms: default_connect_timeout_ms(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

impl ModbusSettings {
    /// Returns the connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the per-request timeout as a [`Duration`].
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Returns the reconnect delay as a [`Duration`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    /// Validates the section.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::validation("modbus.host", "must not be empty"));
        }
        if self.connect_timeout_ms < MIN_TIMEOUT_MS || self.connect_timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::out_of_range(
                "modbus.connect_timeout_ms",
                self.connect_timeout_ms,
                MIN_TIMEOUT_MS,
                MAX_TIMEOUT_MS,
            ));
        }
        if self.operation_timeout_ms < MIN_TIMEOUT_MS || self.operation_timeout_ms > MAX_TIMEOUT_MS
        {
            return Err(ConfigError::out_of_range(
                "modbus.operation_timeout_ms",
                self.operation_timeout_ms,
                MIN_TIMEOUT_MS,
                MAX_TIMEOUT_MS,
            ));
        }
        if self.reconnect_delay_secs < MIN_RECONNECT_DELAY_SECS
            || self.reconnect_delay_secs > MAX_RECONNECT_DELAY_SECS
        {
            return Err(ConfigError::out_of_range(
                "modbus.reconnect_delay_secs",
                self.reconnect_delay_secs,
                MIN_RECONNECT_DELAY_SECS,
                MAX_RECONNECT_DELAY_SECS,
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Poller settings
// ============================================================================

/// The `poller` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollerSettings {
    /// Fixed interval between poll cycles, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl PollerSettings {
    /// Returns the poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validates the section.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS
            || self.poll_interval_ms > MAX_POLL_INTERVAL_MS
        {
            return Err(ConfigError::out_of_range(
                "poller.poll_interval_ms",
                self.poll_interval_ms,
                MIN_POLL_INTERVAL_MS,
                MAX_POLL_INTERVAL_MS,
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Top-level config
// ============================================================================

/// The whole configuration file.
///
/// [`GaugeConfig::default`] carries a small built-in tag table so the
/// binary can run with no file at all. Note the asymmetry: a file that
/// omits the `tags` section yields an EMPTY tag table, not the built-in
/// one. The built-ins only apply when no file is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GaugeConfig {
    /// Device connection settings.
    #[serde(default)]
    pub modbus: ModbusSettings,

    /// Background poller settings.
    #[serde(default)]
    pub poller: PollerSettings,

    /// Tag table, keyed by tag name.
    #[serde(default)]
    pub tags: BTreeMap<String, TagSettings>,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self {
            modbus: ModbusSettings::default(),
            poller: PollerSettings::default(),
            tags: default_tags(),
        }
    }
}

/// The built-in tag table used when no config file is present.
fn default_tags() -> BTreeMap<String, TagSettings> {
    let mut tags = BTreeMap::new();
    tags.insert(
        "temperature".to_string(),
        TagSettings {
            address: 100,
            tag_type: TagType::HoldingRegister,
            length: 1,
            scaling: 0.1,
            unit: Some("°C".to_string()),
            polled: true,
        },
    );
    tags.insert(
        "pressure".to_string(),
        TagSettings {
            address: 101,
            tag_type: TagType::HoldingRegister,
            length: 1,
            scaling: 0.01,
            unit: Some("bar".to_string()),
            polled: true,
        },
    );
    tags.insert(
        "motor_running".to_string(),
        TagSettings {
            address: 0,
            tag_type: TagType::Coil,
            length: 1,
            scaling: 1.0,
            unit: None,
            polled: true,
        },
    );
    tags
}

impl GaugeConfig {
    /// Validates every section and every tag.
    pub fn validate(&self) -> ConfigResult<()> {
        self.modbus.validate()?;
        self.poller.validate()?;
        for (name, tag) in &self.tags {
            tag.validate(name)?;
        }
        Ok(())
    }
}
