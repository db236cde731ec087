// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Connection settings for the Modbus TCP transport.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for one Modbus TCP connection.
///
/// Timeouts bound a single protocol exchange; pacing and reconnect
/// policy live in the connection supervisor, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusTcpConfig {
    /// Target host name or IP address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Target port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Modbus unit id (slave address).
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,

    /// Timeout for establishing the TCP connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Timeout for a single read or write exchange.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout: Duration,

    /// Enable TCP_NODELAY on the socket.
    #[serde(default = "default_true")]
    pub tcp_nodelay: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    502
}

fn default_unit_id() -> u8 {
    1
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_operation_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_true() -> bool {
    true
}

impl ModbusTcpConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the unit id.
    pub fn with_unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-operation timeout.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Sets TCP_NODELAY.
    pub fn with_tcp_nodelay(mut self, nodelay: bool) -> Self {
        self.tcp_nodelay = nodelay;
        self
    }

    /// Returns the `host:port` pair used to open the socket.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the `host:port#unit` display name used in logs.
    pub fn endpoint(&self) -> String {
        format!("{}:{}#{}", self.host, self.port, self.unit_id)
    }
}

impl Default for ModbusTcpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            unit_id: default_unit_id(),
            connect_timeout: default_connect_timeout(),
            operation_timeout: default_operation_timeout(),
            tcp_nodelay: default_true(),
        }
    }
}
