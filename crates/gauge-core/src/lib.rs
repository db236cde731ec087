// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # gauge-core
//!
//! Core polling and write supervision for the Gauge Modbus HMI runtime.
//!
//! This crate owns everything between the register map and the wire,
//! independent of any concrete transport:
//!
//! - **Types**: `Tag`, `Region`, `PolledValue` and the value enums
//! - **Error**: the transport/supervisor/write error chain
//! - **Transport**: the trait a wire implementation fulfils
//! - **Registry**: immutable, validated tag declarations
//! - **Supervisor**: connection state machine and serialized transport
//!   access with background reconnect
//! - **Poller**: fixed-period batched reads publishing to the data bus
//! - **Gateway**: validated operator writes
//! - **Bus**: broadcast distribution of polled values
//!
//! ## Example
//!
//! ```rust,ignore
//! use gauge_core::registry::TagRegistry;
//! use gauge_core::supervisor::{ConnectionSupervisor, SupervisorConfig};
//! use gauge_core::poller::{PollerConfig, RegisterPoller};
//! use gauge_core::types::{Region, Tag};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(TagRegistry::new(vec![
//!     Tag::new("temperature", Region::HoldingRegister, 100).with_scale(0.1),
//! ])?);
//!
//! let supervisor = Arc::new(ConnectionSupervisor::new(transport, SupervisorConfig::default()));
//! supervisor.start();
//! supervisor.request_connect().await?;
//!
//! let poller = RegisterPoller::new(registry, supervisor, PollerConfig::default());
//! poller.start();
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod error;
pub mod registry;
pub mod types;

// =============================================================================
// Transport & Supervision Modules
// =============================================================================

pub mod supervisor;
pub mod transport;

// =============================================================================
// Polling & Write Modules
// =============================================================================

pub mod bus;
pub mod gateway;
pub mod poller;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use error::*;
pub use types::*;

// Re-export transport types
pub use transport::{Transport, TransportOp};

// Re-export registry types
pub use registry::TagRegistry;

// Re-export supervisor types
pub use supervisor::{ConnectionSupervisor, SupervisorConfig, SupervisorStats};

// Re-export poller types
pub use poller::{PollSummary, PollerConfig, PollerStats, RegisterPoller};

// Re-export gateway types
pub use gateway::{GatewayStats, WriteGateway};

// Re-export bus types
pub use bus::{BusStats, DataBus, DataSubscriber, TagFilteredSubscriber};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
