// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # gauge-config
//!
//! Configuration handling for the Gauge HMI data core.
//!
//! ## Features
//!
//! - **Schema**: `modbus`, `poller`, and `tags` sections with validation
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Environment Placeholders**: `${VAR}` and `${VAR:default}` in file content
//! - **Graceful Fallback**: startup can degrade to built-in defaults when
//!   the file is missing or unreadable
//!
//! ## Quick Start
//!
//! ```no_run
//! use gauge_config::load_config_or_default;
//!
//! let config = load_config_or_default("gauge.yaml").unwrap();
//! println!("Device: {}:{}", config.modbus.host, config.modbus.port);
//! println!("Tags: {}", config.tags.len());
//! ```
//!
//! ## Configuration File
//!
//! ```yaml
//! modbus:
//!   host: "${PLC_HOST:192.168.1.10}"
//!   port: 502
//!   unit_id: 1
//!   reconnect_delay_secs: 5
//! poller:
//!   poll_interval_ms: 1000
//! tags:
//!   temperature:
//!     address: 100
//!     type: holding_register
//!     scaling: 0.1
//!     unit: "°C"
//!   motor_running:
//!     address: 0
//!     type: coil
//! ```
//!
//! Every section is optional; omitted fields take their defaults. Note
//! that a file which omits `tags` gets an empty tag table, while running
//! with no file at all gets the built-in demo tags.

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod error;
pub mod loader;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    ConfigFormat,
    ConfigLoader,
    load_config,
    load_config_or_default,
    load_config_str,
};
pub use schema::{
    // Sections
    GaugeConfig,
    ModbusSettings,
    PollerSettings,
    TagSettings,
    TagType,
    // Common defaults
    DEFAULT_CONNECT_TIMEOUT_MS,
    DEFAULT_MODBUS_PORT,
    DEFAULT_OPERATION_TIMEOUT_MS,
    DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_RECONNECT_DELAY_SECS,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

// =============================================================================
// Prelude
// =============================================================================

/// Convenience re-exports for common use cases.
pub mod prelude {
    pub use crate::error::{ConfigError, ConfigResult};
    pub use crate::loader::{ConfigLoader, load_config, load_config_or_default};
    pub use crate::schema::{GaugeConfig, TagSettings, TagType};
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "gauge-config");
    }

    #[test]
    fn test_prelude_imports() {
        use prelude::*;
        let config = GaugeConfig::default();
        assert!(config.validate().is_ok());
    }
}
