// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Builders
//!
//! Builder patterns for constructing complex test objects with sensible
//! defaults.
//!
//! ## Design Principles
//!
//! - Sensible defaults for common test scenarios
//! - Chainable methods for fluent API
//! - Clear separation between required and optional fields

use std::collections::BTreeMap;
use std::sync::Arc;

use gauge_config::{GaugeConfig, ModbusSettings, PollerSettings, TagSettings, TagType};
use gauge_core::{Region, RegistryError, Tag, TagRegistry};

// =============================================================================
// Tag Set Builder
// =============================================================================

/// Builder for tag sets and the registries made from them.
///
/// # Example
///
/// ```rust,ignore
/// let registry = TagSetBuilder::new()
///     .scaled("temperature", 100, 0.1)
///     .coil("motor", 0)
///     .registry();
/// ```
#[derive(Debug, Clone, Default)]
pub struct TagSetBuilder {
    tags: Vec<Tag>,
}

impl TagSetBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain holding-register word.
    pub fn word(mut self, name: impl Into<String>, address: u16) -> Self {
        self.tags.push(Tag::new(name, Region::HoldingRegister, address));
        self
    }

    /// Add a scaled holding-register word.
    pub fn scaled(mut self, name: impl Into<String>, address: u16, scale: f64) -> Self {
        self.tags
            .push(Tag::new(name, Region::HoldingRegister, address).with_scale(scale));
        self
    }

    /// Add a holding-register block of `length` words.
    pub fn block(mut self, name: impl Into<String>, address: u16, length: u16) -> Self {
        self.tags
            .push(Tag::new(name, Region::HoldingRegister, address).with_length(length));
        self
    }

    /// Add a coil.
    pub fn coil(mut self, name: impl Into<String>, address: u16) -> Self {
        self.tags.push(Tag::new(name, Region::Coil, address));
        self
    }

    /// Add a discrete input.
    pub fn discrete_input(mut self, name: impl Into<String>, address: u16) -> Self {
        self.tags.push(Tag::new(name, Region::DiscreteInput, address));
        self
    }

    /// Add an input register.
    pub fn input_register(mut self, name: impl Into<String>, address: u16) -> Self {
        self.tags.push(Tag::new(name, Region::InputRegister, address));
        self
    }

    /// Add an unpolled holding-register word (a pure write target).
    pub fn write_target(mut self, name: impl Into<String>, address: u16) -> Self {
        self.tags
            .push(Tag::new(name, Region::HoldingRegister, address).with_polled(false));
        self
    }

    /// Add a fully custom tag.
    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Consume the builder, returning the tag list.
    pub fn build(self) -> Vec<Tag> {
        self.tags
    }

    /// Build a registry.
    ///
    /// # Panics
    /// Panics if the tag set fails registry validation.
    pub fn registry(self) -> Arc<TagRegistry> {
        Arc::new(TagRegistry::new(self.tags).expect("tag set is valid"))
    }

    /// Build a registry, surfacing validation errors.
    pub fn try_registry(self) -> Result<TagRegistry, RegistryError> {
        TagRegistry::new(self.tags)
    }
}

// =============================================================================
// GaugeConfig Builder
// =============================================================================

/// Builder for [`GaugeConfig`] values.
///
/// Starts from default device and poller settings with an *empty* tag
/// table, unlike [`GaugeConfig::default`], which carries the demo tags.
#[derive(Debug, Clone)]
pub struct GaugeConfigBuilder {
    modbus: ModbusSettings,
    poller: PollerSettings,
    tags: BTreeMap<String, TagSettings>,
}

impl Default for GaugeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GaugeConfigBuilder {
    /// Create a builder with default settings and no tags.
    pub fn new() -> Self {
        Self {
            modbus: ModbusSettings::default(),
            poller: PollerSettings::default(),
            tags: BTreeMap::new(),
        }
    }

    /// Set the device host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.modbus.host = host.into();
        self
    }

    /// Set the device port.
    pub fn port(mut self, port: u16) -> Self {
        self.modbus.port = port;
        self
    }

    /// Set the Modbus unit identifier.
    pub fn unit_id(mut self, unit_id: u8) -> Self {
        self.modbus.unit_id = unit_id;
        self
    }

    /// Enable or disable automatic reconnection.
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.modbus.auto_reconnect = enabled;
        self
    }

    /// Set the reconnect delay in seconds.
    pub fn reconnect_delay_secs(mut self, secs: u64) -> Self {
        self.modbus.reconnect_delay_secs = secs;
        self
    }

    /// Set the poll interval in milliseconds.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.poller.poll_interval_ms = ms;
        self
    }

    /// Add a plain holding-register tag.
    pub fn word_tag(mut self, name: impl Into<String>, address: u16) -> Self {
        self.tags.insert(
            name.into(),
            TagSettings {
                address,
                tag_type: TagType::HoldingRegister,
                length: 1,
                scaling: 1.0,
                unit: None,
                polled: true,
            },
        );
        self
    }

    /// Add a scaled holding-register tag with a display unit.
    pub fn scaled_tag(
        mut self,
        name: impl Into<String>,
        address: u16,
        scaling: f64,
        unit: impl Into<String>,
    ) -> Self {
        self.tags.insert(
            name.into(),
            TagSettings {
                address,
                tag_type: TagType::HoldingRegister,
                length: 1,
                scaling,
                unit: Some(unit.into()),
                polled: true,
            },
        );
        self
    }

    /// Add a coil tag.
    pub fn coil_tag(mut self, name: impl Into<String>, address: u16) -> Self {
        self.tags.insert(
            name.into(),
            TagSettings {
                address,
                tag_type: TagType::Coil,
                length: 1,
                scaling: 1.0,
                unit: None,
                polled: true,
            },
        );
        self
    }

    /// Add an unpolled holding-register tag.
    pub fn unpolled_tag(mut self, name: impl Into<String>, address: u16) -> Self {
        self.tags.insert(
            name.into(),
            TagSettings {
                address,
                tag_type: TagType::HoldingRegister,
                length: 1,
                scaling: 1.0,
                unit: None,
                polled: false,
            },
        );
        self
    }

    /// Add a fully custom tag entry.
    pub fn tag(mut self, name: impl Into<String>, settings: TagSettings) -> Self {
        self.tags.insert(name.into(), settings);
        self
    }

    /// Consume the builder, returning the configuration.
    pub fn build(self) -> GaugeConfig {
        GaugeConfig {
            modbus: self.modbus,
            poller: self.poller,
            tags: self.tags,
        }
    }

    /// Build and validate.
    ///
    /// # Panics
    /// Panics if the configuration fails validation.
    pub fn build_valid(self) -> GaugeConfig {
        let config = self.build();
        config.validate().expect("built configuration is valid");
        config
    }
}
