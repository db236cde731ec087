// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # gauge-modbus
//!
//! Modbus TCP transport for the Gauge HMI data core.
//!
//! This crate implements [`gauge_core::Transport`] on top of
//! `tokio-modbus`:
//!
//! - **Single connection**: one TCP socket to one PLC unit, owned
//!   exclusively by the connection supervisor
//! - **All register regions**: Coil, Discrete Input, Holding Register,
//!   Input Register
//! - **Bounded operations**: every exchange runs under a configurable
//!   timeout
//! - **Fail-fast on loss**: a lost connection discards the protocol
//!   context; reconnecting is the supervisor's decision, never this
//!   crate's
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gauge_core::{Region, Transport};
//! use gauge_modbus::{ModbusTcpConfig, ModbusTcpTransport};
//!
//! let config = ModbusTcpConfig::new()
//!     .with_host("192.168.1.100")
//!     .with_unit_id(1);
//!
//! let mut transport = ModbusTcpTransport::new(config);
//! transport.connect().await?;
//!
//! let values = transport.read(Region::HoldingRegister, 100, 2).await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod config;
pub mod tcp;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::ModbusTcpConfig;
pub use tcp::ModbusTcpTransport;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
