// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus TCP implementation of the [`Transport`] trait.
//!
//! Built on `tokio-modbus`. The transport owns at most one protocol
//! context; a lost connection drops the context so no operation can
//! ever reuse a dead socket. Retry and reconnect policy are the
//! connection supervisor's job, so every error here surfaces after a
//! single attempt.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_modbus::client::{Context as ModbusContext, Reader, Writer};
use tokio_modbus::prelude::*;
use tokio_modbus::{Error as TokioModbusError, ExceptionCode};

use gauge_core::{Region, RegisterValues, Transport, TransportError, WritePayload};

use crate::config::ModbusTcpConfig;

// =============================================================================
// ModbusTcpTransport
// =============================================================================

/// One Modbus TCP connection to one PLC unit.
///
/// Methods take `&mut self`; the owning supervisor serializes access,
/// so no internal locking is needed.
///
/// # Example
///
/// ```rust,ignore
/// use gauge_core::{Region, Transport};
/// use gauge_modbus::{ModbusTcpConfig, ModbusTcpTransport};
///
/// let config = ModbusTcpConfig::new().with_host("192.168.1.100");
/// let mut transport = ModbusTcpTransport::new(config);
/// transport.connect().await?;
/// let values = transport.read(Region::HoldingRegister, 100, 2).await?;
/// ```
pub struct ModbusTcpTransport {
    config: ModbusTcpConfig,
    /// Live protocol context; `None` while disconnected.
    context: Option<ModbusContext>,
}

impl ModbusTcpTransport {
    /// Creates a transport for the given connection settings. No
    /// connection is opened until [`Transport::connect`] is called.
    pub fn new(config: ModbusTcpConfig) -> Self {
        Self {
            config,
            context: None,
        }
    }

    /// Returns the connection settings.
    pub fn config(&self) -> &ModbusTcpConfig {
        &self.config
    }

    /// Resolves the configured host to a socket address.
    async fn resolve_address(&mut self) -> Result<SocketAddr, TransportError> {
        let addr = self.config.socket_addr();

        // Literal IP:port needs no DNS round-trip.
        if let Ok(parsed) = addr.parse::<SocketAddr>() {
            return Ok(parsed);
        }

        let mut hosts = tokio::net::lookup_host(&addr)
            .await
            .map_err(|err| {
                TransportError::connection_lost(format!("resolving {addr}: {err}"))
            })?;

        hosts
            .next()
            .ok_or_else(|| TransportError::connection_lost(format!("no address for {addr}")))
    }

    async fn perform_read(
        &mut self,
        region: Region,
        address: u16,
        count: u16,
    ) -> Result<RegisterValues, TransportError> {
        let op_timeout = self.config.operation_timeout;
        let ctx = self.context.as_mut().ok_or_else(not_connected)?;

        match region {
            Region::Coil => {
                let bits = timeout(op_timeout, ctx.read_coils(address, count))
                    .await
                    .map_err(|_| TransportError::timeout(op_timeout))?
                    .map_err(|err| map_link_error(err, op_timeout))?
                    .map_err(map_exception)?;
                Ok(RegisterValues::Bits(bits))
            }
            Region::DiscreteInput => {
                let bits = timeout(op_timeout, ctx.read_discrete_inputs(address, count))
                    .await
                    .map_err(|_| TransportError::timeout(op_timeout))?
                    .map_err(|err| map_link_error(err, op_timeout))?
                    .map_err(map_exception)?;
                Ok(RegisterValues::Bits(bits))
            }
            Region::HoldingRegister => {
                let words = timeout(op_timeout, ctx.read_holding_registers(address, count))
                    .await
                    .map_err(|_| TransportError::timeout(op_timeout))?
                    .map_err(|err| map_link_error(err, op_timeout))?
                    .map_err(map_exception)?;
                Ok(RegisterValues::Words(words))
            }
            Region::InputRegister => {
                let words = timeout(op_timeout, ctx.read_input_registers(address, count))
                    .await
                    .map_err(|_| TransportError::timeout(op_timeout))?
                    .map_err(|err| map_link_error(err, op_timeout))?
                    .map_err(map_exception)?;
                Ok(RegisterValues::Words(words))
            }
        }
    }

    async fn perform_write(
        &mut self,
        region: Region,
        address: u16,
        payload: WritePayload,
    ) -> Result<(), TransportError> {
        let op_timeout = self.config.operation_timeout;
        let ctx = self.context.as_mut().ok_or_else(not_connected)?;

        match (region, payload) {
            (Region::Coil, WritePayload::Coil(value)) => {
                timeout(op_timeout, ctx.write_single_coil(address, value))
                    .await
                    .map_err(|_| TransportError::timeout(op_timeout))?
                    .map_err(|err| map_link_error(err, op_timeout))?
                    .map_err(map_exception)
            }
            (Region::HoldingRegister, WritePayload::Register(value)) => {
                timeout(op_timeout, ctx.write_single_register(address, value))
                    .await
                    .map_err(|_| TransportError::timeout(op_timeout))?
                    .map_err(|err| map_link_error(err, op_timeout))?
                    .map_err(map_exception)
            }
            (Region::HoldingRegister, WritePayload::Registers(values)) => {
                timeout(op_timeout, ctx.write_multiple_registers(address, &values))
                    .await
                    .map_err(|_| TransportError::timeout(op_timeout))?
                    .map_err(|err| map_link_error(err, op_timeout))?
                    .map_err(map_exception)
            }
            // Read-only regions and mismatched payload shapes; the
            // write gateway filters these out before the transport is
            // ever reached.
            (region, payload) => {
                tracing::warn!(
                    region = %region,
                    payload = ?payload,
                    "Unsupported write rejected as illegal function"
                );
                Err(TransportError::exception(0x01))
            }
        }
    }

    /// Discards the protocol context when an operation reports a lost
    /// connection, so the next call fails fast instead of reusing a
    /// dead socket.
    fn drop_context_on_loss<T>(
        &mut self,
        outcome: Result<T, TransportError>,
    ) -> Result<T, TransportError> {
        if let Err(err) = &outcome {
            if err.is_connection_lost() && self.context.is_some() {
                self.context = None;
                tracing::warn!(
                    endpoint = %self.config.endpoint(),
                    error = %err,
                    "Dropping Modbus context after lost connection"
                );
            }
        }
        outcome
    }
}

#[async_trait]
impl Transport for ModbusTcpTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.context.is_some() {
            return Ok(());
        }

        let socket_addr = self.resolve_address().await?;
        let connect_timeout = self.config.connect_timeout;

        let stream = timeout(connect_timeout, TcpStream::connect(socket_addr))
            .await
            .map_err(|_| {
                TransportError::connection_lost(format!(
                    "connect to {socket_addr} timed out after {connect_timeout:?}"
                ))
            })?
            .map_err(|err| {
                TransportError::connection_lost(format!("connect to {socket_addr}: {err}"))
            })?;

        stream.set_nodelay(self.config.tcp_nodelay).ok();

        let slave = Slave(self.config.unit_id);
        self.context = Some(tcp::attach_slave(stream, slave));

        tracing::info!(
            host = %self.config.host,
            port = self.config.port,
            unit_id = self.config.unit_id,
            "Connected to Modbus TCP device"
        );

        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        if let Some(mut ctx) = self.context.take() {
            if let Err(err) = ctx.disconnect().await {
                tracing::warn!(
                    endpoint = %self.config.endpoint(),
                    error = %err,
                    "Error closing Modbus connection"
                );
            }
            tracing::debug!(
                endpoint = %self.config.endpoint(),
                "Disconnected from Modbus TCP device"
            );
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.context.is_some()
    }

    async fn read(
        &mut self,
        region: Region,
        address: u16,
        count: u16,
    ) -> Result<RegisterValues, TransportError> {
        let outcome = self.perform_read(region, address, count).await;
        self.drop_context_on_loss(outcome)
    }

    async fn write(
        &mut self,
        region: Region,
        address: u16,
        payload: WritePayload,
    ) -> Result<(), TransportError> {
        let outcome = self.perform_write(region, address, payload).await;
        self.drop_context_on_loss(outcome)
    }

    fn endpoint(&self) -> String {
        self.config.endpoint()
    }
}

impl fmt::Debug for ModbusTcpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModbusTcpTransport")
            .field("endpoint", &self.config.endpoint())
            .field("connected", &self.is_connected())
            .finish()
    }
}

// =============================================================================
// Error mapping
// =============================================================================

fn not_connected() -> TransportError {
    TransportError::connection_lost("not connected")
}

/// Maps a tokio-modbus error to a [`TransportError`].
///
/// An io-level timeout becomes [`TransportError::Timeout`]; any other
/// socket failure leaves the stream in an unknown state and is treated
/// as a lost connection. A protocol violation (malformed or mismatched
/// frame) surfaces as a protocol error with no exception code.
fn map_link_error(error: TokioModbusError, operation_timeout: Duration) -> TransportError {
    match error {
        TokioModbusError::Transport(io_error) => {
            if io_error.kind() == std::io::ErrorKind::TimedOut {
                TransportError::timeout(operation_timeout)
            } else {
                TransportError::connection_lost(io_error.to_string())
            }
        }
        TokioModbusError::Protocol(protocol_error) => TransportError::Protocol {
            code: 0xFF,
            message: format!("protocol violation: {protocol_error:?}"),
        },
    }
}

fn map_exception(code: ExceptionCode) -> TransportError {
    TransportError::exception(exception_code_to_u8(&code))
}

/// Converts an [`ExceptionCode`] to its numeric Modbus exception code.
fn exception_code_to_u8(code: &ExceptionCode) -> u8 {
    match code {
        ExceptionCode::IllegalFunction => 0x01,
        ExceptionCode::IllegalDataAddress => 0x02,
        ExceptionCode::IllegalDataValue => 0x03,
        ExceptionCode::ServerDeviceFailure => 0x04,
        ExceptionCode::Acknowledge => 0x05,
        ExceptionCode::ServerDeviceBusy => 0x06,
        ExceptionCode::MemoryParityError => 0x08,
        ExceptionCode::GatewayPathUnavailable => 0x0A,
        ExceptionCode::GatewayTargetDevice => 0x0B,
        _ => 0xFF,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tokio::net::TcpListener;

    fn transport_for(addr: SocketAddr) -> ModbusTcpTransport {
        let config = ModbusTcpConfig::new()
            .with_host(addr.ip().to_string())
            .with_port(addr.port())
            .with_connect_timeout(Duration::from_secs(1))
            .with_operation_timeout(Duration::from_millis(100));
        ModbusTcpTransport::new(config)
    }

    #[test]
    fn test_exception_code_table() {
        assert_eq!(exception_code_to_u8(&ExceptionCode::IllegalFunction), 0x01);
        assert_eq!(
            exception_code_to_u8(&ExceptionCode::IllegalDataAddress),
            0x02
        );
        assert_eq!(exception_code_to_u8(&ExceptionCode::IllegalDataValue), 0x03);
        assert_eq!(
            exception_code_to_u8(&ExceptionCode::ServerDeviceFailure),
            0x04
        );
        assert_eq!(exception_code_to_u8(&ExceptionCode::Acknowledge), 0x05);
        assert_eq!(exception_code_to_u8(&ExceptionCode::ServerDeviceBusy), 0x06);
        assert_eq!(
            exception_code_to_u8(&ExceptionCode::MemoryParityError),
            0x08
        );
        assert_eq!(
            exception_code_to_u8(&ExceptionCode::GatewayPathUnavailable),
            0x0A
        );
        assert_eq!(
            exception_code_to_u8(&ExceptionCode::GatewayTargetDevice),
            0x0B
        );
    }

    #[test]
    fn test_map_exception_fills_name() {
        let err = map_exception(ExceptionCode::IllegalDataAddress);
        assert_eq!(
            err,
            TransportError::Protocol {
                code: 0x02,
                message: "illegal data address".to_string(),
            }
        );
    }

    #[test]
    fn test_link_error_mapping() {
        let op_timeout = Duration::from_secs(3);

        let timed_out = TokioModbusError::Transport(io::Error::new(
            io::ErrorKind::TimedOut,
            "no response",
        ));
        assert_eq!(
            map_link_error(timed_out, op_timeout),
            TransportError::timeout(op_timeout)
        );

        for kind in [
            io::ErrorKind::ConnectionRefused,
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::BrokenPipe,
            io::ErrorKind::UnexpectedEof,
        ] {
            let err = TokioModbusError::Transport(io::Error::new(kind, "socket failure"));
            assert!(
                map_link_error(err, op_timeout).is_connection_lost(),
                "{kind:?} should map to a lost connection"
            );
        }
    }

    #[tokio::test]
    async fn test_connect_and_disconnect_are_idempotent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut transport = transport_for(addr);
        assert!(!transport.is_connected());

        transport.connect().await.unwrap();
        assert!(transport.is_connected());

        // Connecting again is a no-op.
        transport.connect().await.unwrap();
        assert!(transport.is_connected());

        transport.disconnect().await.unwrap();
        assert!(!transport.is_connected());

        // Disconnecting again is a no-op.
        transport.disconnect().await.unwrap();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_connect_failure_reports_connection_lost() {
        // Bind a listener to grab a free port, then drop it so the
        // connect attempt is refused.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut transport = transport_for(addr);
        let err = transport.connect().await.unwrap_err();
        assert!(err.is_connection_lost());
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let config = ModbusTcpConfig::new();
        let mut transport = ModbusTcpTransport::new(config);

        let err = transport
            .read(Region::HoldingRegister, 100, 1)
            .await
            .unwrap_err();
        assert!(err.is_connection_lost());

        let err = transport
            .write(Region::Coil, 0, WritePayload::Coil(true))
            .await
            .unwrap_err();
        assert!(err.is_connection_lost());
    }

    #[tokio::test]
    async fn test_silent_peer_times_out_but_keeps_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut transport = transport_for(addr);
        transport.connect().await.unwrap();

        // The peer accepts but never answers, so the operation timeout
        // elapses. A timeout is not a lost connection.
        let err = transport
            .read(Region::HoldingRegister, 0, 1)
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::timeout(Duration::from_millis(100)));
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn test_peer_close_drops_context() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut transport = transport_for(addr);
        transport.connect().await.unwrap();

        // Close the server side of the socket under the client.
        let (server_side, _) = listener.accept().await.unwrap();
        drop(server_side);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = transport
            .read(Region::HoldingRegister, 0, 1)
            .await
            .unwrap_err();
        assert!(err.is_connection_lost());
        assert!(!transport.is_connected());
    }

    #[test]
    fn test_endpoint_format() {
        let transport = ModbusTcpTransport::new(
            ModbusTcpConfig::new().with_host("10.0.0.5").with_unit_id(2),
        );
        assert_eq!(transport.endpoint(), "10.0.0.5:502#2");
    }
}
