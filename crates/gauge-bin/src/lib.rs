// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # gauge-bin
//!
//! CLI binary for the Gauge HMI data core.
//!
//! This crate provides the main binary entry point for Gauge, including:
//!
//! - CLI argument parsing with clap
//! - Runtime orchestration of the core components
//! - Graceful shutdown handling
//! - Logging initialization
//! - Command implementations (run, validate, version, read, write)
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                   main.rs                    │
//! └──────────────────────┬───────────────────────┘
//!                        │
//!                 ┌──────▼──────┐
//!                 │    cli.rs   │
//!                 └──────┬──────┘
//!                        │
//!            ┌───────────┼───────────┐
//!            ▼           ▼           ▼
//!     ┌──────────┐ ┌──────────┐ ┌──────────┐
//!     │ commands │ │ runtime  │ │ logging  │
//!     └──────────┘ └────┬─────┘ └──────────┘
//!                       │
//!                ┌──────▼──────┐
//!                │  shutdown   │
//!                └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the data core (default command)
//! gauge
//!
//! # Start with custom config
//! gauge -c /etc/gauge/gauge.yaml
//!
//! # Validate configuration
//! gauge validate
//!
//! # Poll once and print every tag
//! gauge read
//!
//! # Write a coil
//! gauge write motor_running on
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{GaugeRuntime, RuntimeBuilder};
pub use shutdown::ShutdownCoordinator;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
