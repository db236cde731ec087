// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Runtime orchestration.
//!
//! This module wires the configuration into the core components and
//! owns their lifecycle:
//!
//! - Tag table conversion and registry construction
//! - Modbus TCP transport and connection supervisor setup
//! - Background poller startup
//! - Graceful shutdown coordination

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use gauge_config::{load_config_or_default, GaugeConfig, TagSettings, TagType};
use gauge_core::{
    ConnectionSupervisor, PollerConfig, Region, RegisterPoller, SupervisorConfig, Tag, TagRegistry,
};
use gauge_modbus::{ModbusTcpConfig, ModbusTcpTransport};

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// Config conversion
// =============================================================================

fn region_from(tag_type: TagType) -> Region {
    match tag_type {
        TagType::Coil => Region::Coil,
        TagType::DiscreteInput => Region::DiscreteInput,
        TagType::HoldingRegister => Region::HoldingRegister,
        TagType::InputRegister => Region::InputRegister,
    }
}

fn tag_from_settings(name: &str, settings: &TagSettings) -> Tag {
    let mut tag = Tag::new(name, region_from(settings.tag_type), settings.address)
        .with_length(settings.length)
        .with_scale(settings.scaling)
        .with_polled(settings.polled);
    if let Some(unit) = &settings.unit {
        tag = tag.with_unit(unit.clone());
    }
    tag
}

/// Converts the configured tag table into core tag declarations.
pub fn tags_from_config(config: &GaugeConfig) -> Vec<Tag> {
    config
        .tags
        .iter()
        .map(|(name, settings)| tag_from_settings(name, settings))
        .collect()
}

// =============================================================================
// Core component construction
// =============================================================================

/// The registry and supervisor a command needs to talk to the device.
///
/// The supervisor is created but not started; the caller decides when
/// its background task begins.
pub struct CoreComponents {
    /// Validated tag declarations.
    pub registry: Arc<TagRegistry>,
    /// Connection supervisor over the Modbus TCP transport.
    pub supervisor: Arc<ConnectionSupervisor>,
}

/// Builds the registry, transport, and supervisor from configuration.
pub fn build_core(config: &GaugeConfig) -> BinResult<CoreComponents> {
    let registry = Arc::new(TagRegistry::new(tags_from_config(config))?);

    let transport = ModbusTcpTransport::new(
        ModbusTcpConfig::new()
            .with_host(config.modbus.host.clone())
            .with_port(config.modbus.port)
            .with_unit_id(config.modbus.unit_id)
            .with_connect_timeout(config.modbus.connect_timeout())
            .with_operation_timeout(config.modbus.operation_timeout()),
    );

    let supervisor_config = SupervisorConfig::new()
        .with_auto_reconnect(config.modbus.auto_reconnect)
        .with_reconnect_delay(config.modbus.reconnect_delay());

    let supervisor = Arc::new(ConnectionSupervisor::new(
        Box::new(transport),
        supervisor_config,
    ));

    Ok(CoreComponents {
        registry,
        supervisor,
    })
}

// =============================================================================
// GaugeRuntime
// =============================================================================

/// The long-running runtime behind the `run` command.
///
/// The runtime is responsible for:
/// - Building the core components from configuration
/// - Starting the supervisor and the background poller
/// - Coordinating graceful shutdown
pub struct GaugeRuntime {
    config: GaugeConfig,
    shutdown: ShutdownCoordinator,
    skip_connect: bool,
}

/// Components the main loop keeps alive until shutdown.
struct RuntimeComponents {
    registry: Arc<TagRegistry>,
    supervisor: Arc<ConnectionSupervisor>,
    poller: Arc<RegisterPoller>,
}

impl GaugeRuntime {
    /// Creates a runtime over the given configuration.
    pub fn new(config: GaugeConfig) -> Self {
        Self {
            config,
            shutdown: ShutdownCoordinator::new(),
            skip_connect: false,
        }
    }

    /// Skips the initial connection attempt on startup.
    pub fn with_skip_connect(mut self, skip: bool) -> Self {
        self.skip_connect = skip;
        self
    }

    /// Runs until a shutdown signal arrives.
    pub async fn run(self) -> BinResult<()> {
        info!("Starting Gauge v{}", gauge_core::VERSION);

        let components = self.initialize_components().await?;
        let result = self.run_main_loop(components).await;

        info!("Gauge shutdown complete");
        result
    }

    /// Builds and starts all components.
    async fn initialize_components(&self) -> BinResult<RuntimeComponents> {
        info!("Initializing components...");

        let core = build_core(&self.config)?;

        if core.registry.is_empty() {
            warn!("No tags configured; the poller will idle");
        }

        core.supervisor.start();

        if self.skip_connect {
            info!("Skipping initial connection attempt");
        } else if let Err(err) = core.supervisor.request_connect().await {
            // The supervisor keeps retrying in the background when
            // auto-reconnect is enabled.
            warn!(error = %err, "Initial connection attempt failed");
        }

        let poller = Arc::new(RegisterPoller::new(
            core.registry.clone(),
            core.supervisor.clone(),
            PollerConfig::new().with_poll_interval(self.config.poller.poll_interval()),
        ));
        poller.start();

        Ok(RuntimeComponents {
            registry: core.registry,
            supervisor: core.supervisor,
            poller,
        })
    }

    /// Waits for shutdown, then stops components in reverse order.
    async fn run_main_loop(&self, components: RuntimeComponents) -> BinResult<()> {
        self.spawn_state_indicator(&components);
        self.spawn_bus_logger(&components);

        info!(
            endpoint = %components.supervisor.endpoint(),
            tags = components.registry.len(),
            poll_interval_ms = self.config.poller.poll_interval_ms,
            "Gauge is ready"
        );
        self.shutdown.wait_for_shutdown().await;

        info!("Shutdown initiated, cleaning up...");
        components.poller.stop();
        components.supervisor.request_disconnect().await;
        components.supervisor.stop();

        Ok(())
    }

    /// Logs every connection state transition until shutdown.
    ///
    /// The headless counterpart of a front end's connection indicator:
    /// whoever tails the log sees the same transitions a UI would show.
    fn spawn_state_indicator(&self, components: &RuntimeComponents) {
        let mut states = components.supervisor.subscribe_state();
        let endpoint = components.supervisor.endpoint().to_string();
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    state = states.recv() => match state {
                        Ok(state) => {
                            info!(endpoint = %endpoint, state = %state, "Connection state changed")
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = shutdown_rx.recv() => break,
                }
            }
        });
    }

    /// Drains the data bus into debug logs until shutdown.
    fn spawn_bus_logger(&self, components: &RuntimeComponents) {
        let mut subscriber = components.poller.subscribe();
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    value = subscriber.recv() => match value {
                        Some(value) => debug!(
                            tag = %value.tag.name,
                            value = %value.scaled,
                            valid = value.valid,
                            "Tag updated"
                        ),
                        None => break,
                    },
                    _ = shutdown_rx.recv() => break,
                }
            }
        });
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for constructing the runtime.
pub struct RuntimeBuilder {
    config_path: Option<PathBuf>,
    config: Option<GaugeConfig>,
    skip_connect: bool,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_path: None,
            config: None,
            skip_connect: false,
        }
    }

    /// Sets the configuration file path.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: GaugeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Skips the initial connection attempt on startup.
    pub fn skip_connect(mut self, skip: bool) -> Self {
        self.skip_connect = skip;
        self
    }

    /// Builds the runtime.
    ///
    /// When built from a path, a missing or unreadable file degrades to
    /// the built-in defaults; a file with invalid content is an error.
    pub fn build(self) -> BinResult<GaugeRuntime> {
        let config = match self.config {
            Some(config) => config,
            None => {
                let path = self
                    .config_path
                    .ok_or_else(|| BinError::config("No configuration provided"))?;
                load_config_or_default(&path)?
            }
        };

        Ok(GaugeRuntime::new(config).with_skip_connect(self.skip_connect))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gauge_core::ConnectionState;
    use std::io::Write as _;

    #[test]
    fn test_runtime_builder() {
        let runtime = RuntimeBuilder::new()
            .config(GaugeConfig::default())
            .skip_connect(true)
            .build()
            .unwrap();

        assert!(runtime.skip_connect);
    }

    #[test]
    fn test_runtime_builder_requires_config() {
        let result = RuntimeBuilder::new().build();
        assert!(result.is_err());
    }

    #[test]
    fn test_runtime_builder_falls_back_for_missing_file() {
        let runtime = RuntimeBuilder::new()
            .config_path("/no/such/dir/gauge.yaml")
            .build()
            .unwrap();

        assert_eq!(runtime.config.tags.len(), 3);
    }

    #[test]
    fn test_runtime_builder_rejects_invalid_content() {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(b"poller:\n  poll_interval_ms: 0\n").unwrap();

        let result = RuntimeBuilder::new().config_path(file.path()).build();
        assert!(matches!(result, Err(BinError::Config(_))));
    }

    #[test]
    fn test_region_mapping() {
        assert_eq!(region_from(TagType::Coil), Region::Coil);
        assert_eq!(region_from(TagType::DiscreteInput), Region::DiscreteInput);
        assert_eq!(region_from(TagType::HoldingRegister), Region::HoldingRegister);
        assert_eq!(region_from(TagType::InputRegister), Region::InputRegister);
    }

    #[test]
    fn test_tags_from_default_config() {
        let tags = tags_from_config(&GaugeConfig::default());
        assert_eq!(tags.len(), 3);

        let temperature = tags.iter().find(|t| t.name == "temperature").unwrap();
        assert_eq!(temperature.region, Region::HoldingRegister);
        assert_eq!(temperature.address, 100);
        assert_eq!(temperature.scale, 0.1);
        assert_eq!(temperature.unit.as_deref(), Some("°C"));
        assert!(temperature.polled);

        let motor = tags.iter().find(|t| t.name == "motor_running").unwrap();
        assert_eq!(motor.region, Region::Coil);
        assert_eq!(motor.address, 0);
    }

    #[test]
    fn test_build_core_from_defaults() {
        let core = build_core(&GaugeConfig::default()).unwrap();
        assert_eq!(core.registry.len(), 3);
        assert_eq!(core.supervisor.endpoint(), "127.0.0.1:502#1");
        assert_eq!(core.supervisor.current_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_build_core_rejects_overlapping_polled_tags() {
        let mut config = GaugeConfig::default();
        config.tags.insert(
            "temperature_shadow".to_string(),
            gauge_config::TagSettings {
                address: 100,
                tag_type: TagType::HoldingRegister,
                length: 1,
                scaling: 1.0,
                unit: None,
                polled: true,
            },
        );

        let result = build_core(&config);
        assert!(matches!(result, Err(BinError::Registry(_))));
    }
}
