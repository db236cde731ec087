// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! Full-stack wiring for integration tests: one [`MockTransport`]
//! device under a real supervisor, poller, and write gateway.
//!
//! The harness owns the supervisor's background task from construction
//! and tears everything down explicitly, so tests never leak tasks into
//! each other.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use gauge_core::{
    ConnectionSupervisor, PollerConfig, RegisterPoller, SupervisorConfig, Tag, TagRegistry,
    WriteGateway,
};

use super::fixtures::{DeviceFixtures, TagFixtures};
use super::mocks::MockTransport;

// =============================================================================
// Stack Configuration
// =============================================================================

/// Knobs for the test stack.
#[derive(Debug, Clone)]
pub struct StackConfig {
    /// Whether the supervisor reconnects automatically.
    pub auto_reconnect: bool,
    /// Fixed delay between reconnect attempts.
    pub reconnect_delay: Duration,
    /// Fixed period between poll cycles.
    pub poll_interval: Duration,
    /// Data bus capacity.
    pub bus_capacity: usize,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            reconnect_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
            bus_capacity: 256,
        }
    }
}

impl StackConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable automatic reconnection.
    pub fn no_reconnect(mut self) -> Self {
        self.auto_reconnect = false;
        self
    }

    /// Set the reconnect delay.
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

// =============================================================================
// Test Stack
// =============================================================================

/// A complete data core over an in-memory device.
///
/// The supervisor task runs from construction; polling starts only when
/// [`start_polling`](Self::start_polling) is called, so tests drive
/// cycles deterministically with `poller.poll_once()` by default.
pub struct TestStack {
    /// The in-memory device, for seeding and fault injection.
    pub mock: MockTransport,
    /// The registry behind the poller and gateway.
    pub registry: Arc<TagRegistry>,
    /// The supervisor owning the mock transport.
    pub supervisor: Arc<ConnectionSupervisor>,
    /// The register poller.
    pub poller: Arc<RegisterPoller>,
    /// The write gateway.
    pub gateway: WriteGateway,

    supervisor_task: JoinHandle<()>,
    poller_task: Option<JoinHandle<()>>,
}

impl TestStack {
    /// Build a stack over the given tags with default knobs.
    ///
    /// # Panics
    /// Panics if the tag set fails registry validation.
    pub fn new(tags: Vec<Tag>) -> Self {
        Self::with_config(tags, StackConfig::default())
    }

    /// Build a stack over the given tags.
    pub fn with_config(tags: Vec<Tag>, config: StackConfig) -> Self {
        let mock = MockTransport::new();
        let registry = Arc::new(TagRegistry::new(tags).expect("stack tags are valid"));

        let supervisor = Arc::new(ConnectionSupervisor::new(
            Box::new(mock.clone()),
            SupervisorConfig::new()
                .with_auto_reconnect(config.auto_reconnect)
                .with_reconnect_delay(config.reconnect_delay),
        ));
        let supervisor_task = supervisor.start();

        let poller = Arc::new(RegisterPoller::new(
            registry.clone(),
            supervisor.clone(),
            PollerConfig::new()
                .with_poll_interval(config.poll_interval)
                .with_bus_capacity(config.bus_capacity),
        ));
        let gateway = WriteGateway::new(registry.clone(), supervisor.clone());

        Self {
            mock,
            registry,
            supervisor,
            poller,
            gateway,
            supervisor_task,
            poller_task: None,
        }
    }

    /// Build a stack over the demo tag table with matching device
    /// contents already seeded.
    pub async fn demo() -> Self {
        let stack = Self::new(TagFixtures::demo_tags());
        DeviceFixtures::seed_demo(&stack.mock).await;
        stack
    }

    /// Connect the supervisor.
    ///
    /// # Panics
    /// Panics if the connect attempt fails.
    pub async fn connect(&self) {
        self.supervisor
            .request_connect()
            .await
            .expect("connect failed");
    }

    /// Start the periodic poll loop.
    pub fn start_polling(&mut self) {
        if self.poller_task.is_none() {
            self.poller_task = Some(self.poller.start());
        }
    }

    /// Stop all background tasks and close the connection.
    pub async fn teardown(self) {
        if let Some(task) = self.poller_task {
            self.poller.stop();
            task.await.expect("poll task panicked");
        }

        self.supervisor.request_disconnect().await;
        self.supervisor.stop();
        self.supervisor_task.await.expect("supervisor task panicked");
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gauge_core::ConnectionState;

    #[tokio::test]
    async fn test_stack_lifecycle() {
        let stack = TestStack::demo().await;
        assert_eq!(stack.supervisor.current_state(), ConnectionState::Disconnected);

        stack.connect().await;
        assert_eq!(stack.supervisor.current_state(), ConnectionState::Connected);
        assert_eq!(stack.registry.len(), 3);

        stack.teardown().await;
    }

    #[tokio::test]
    async fn test_teardown_stops_polling() {
        let mut stack = TestStack::demo().await;
        stack.connect().await;
        stack.start_polling();
        assert!(stack.poller.is_running());

        let poller = stack.poller.clone();
        stack.teardown().await;
        assert!(!poller.is_running());
    }
}
