// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Gauge Integration Tests
//!
//! This crate provides integration tests for the Gauge HMI data core,
//! together with the shared test utilities they are built on: an
//! in-memory Modbus device, tag and configuration fixtures, builders,
//! and assertion helpers.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: Pre-built tags, registries, and configuration documents
//!   - `builders`: Builder patterns for tag sets and configurations
//!   - `assertions`: Custom assertion helpers
//!   - `mocks`: The in-memory [`MockTransport`](common::mocks::MockTransport) device
//!   - `harness`: [`TestStack`](common::harness::TestStack) wiring for full-stack tests
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p gauge-tests
//!
//! # Run specific test suite
//! cargo test -p gauge-tests --test integration_core
//! cargo test -p gauge-tests --test integration_supervisor
//! cargo test -p gauge-tests --test integration_config
//! cargo test -p gauge-tests --test integration_runtime
//!
//! # Run with verbose output
//! cargo test -p gauge-tests -- --nocapture
//! ```
//!
//! ## Test Categories
//!
//! ### Core Tests (`integration_core.rs`)
//! - Poll cycles against the in-memory device
//! - Raw-to-scaled value conversion
//! - Tag independence on partial failures
//! - Write gateway validation and execution
//! - Data bus publication
//!
//! ### Supervisor Tests (`integration_supervisor.rs`)
//! - Connection lifecycle and state transitions
//! - Fail-fast admission while disconnected
//! - Automatic reconnection pacing
//! - Operation serialization on the shared connection
//!
//! ### Config Tests (`integration_config.rs`)
//! - Configuration parsing (YAML, TOML, JSON)
//! - Environment variable placeholders
//! - Fallback to built-in defaults
//! - Validation rules
//!
//! ### Runtime Tests (`integration_runtime.rs`)
//! - Configuration-to-registry wiring
//! - Full stack driven from a parsed configuration file
//!
//! ## Writing New Tests
//!
//! ### Using Fixtures
//!
//! ```rust,ignore
//! use gauge_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let registry = RegistryFixtures::demo();
//!     // ... test logic
//! }
//! ```
//!
//! ### Using the Test Stack
//!
//! ```rust,ignore
//! use gauge_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_with_stack() {
//!     let stack = TestStack::demo().await;
//!     stack.connect().await;
//!     let summary = stack.poller.poll_once().await;
//!     assert_eq!(summary.failed, 0);
//!     stack.teardown().await;
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::fixtures::*;
    pub use crate::common::builders::*;
    pub use crate::common::assertions::*;
    pub use crate::common::mocks::*;
    pub use crate::common::harness::*;
}
