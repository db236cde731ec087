// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Write gateway.
//!
//! The single path for operator-initiated writes. Every request is
//! validated against the tag's declaration before the transport is
//! involved, in a fixed order:
//!
//! 1. the tag must exist;
//! 2. its region must be writable (coils and holding registers);
//! 3. the value must fit the tag's shape, so `3.5` aimed at a coil or
//!    a register fails as a type mismatch, never as a device error;
//! 4. the connection must be up, checked without touching the
//!    transport.
//!
//! Only then is exactly one transport write issued. A rejection by the
//! device surfaces as [`WriteError::Protocol`]; a lost socket as
//! [`WriteError::Transport`]. There is no implicit retry: the operator
//! decides whether to try again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::WriteError;
use crate::registry::TagRegistry;
use crate::supervisor::ConnectionSupervisor;
use crate::types::{Tag, WritePayload, WriteValue};

// =============================================================================
// Statistics
// =============================================================================

/// Snapshot of gateway activity.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GatewayStats {
    /// Writes handed to the transport.
    pub writes: u64,
    /// Writes rejected by validation, before the transport.
    pub writes_rejected: u64,
    /// Writes that reached the transport and failed.
    pub write_failures: u64,
}

/// Atomic counters behind [`GatewayStats`].
#[derive(Debug, Default)]
struct StatsInner {
    writes: AtomicU64,
    writes_rejected: AtomicU64,
    write_failures: AtomicU64,
}

// =============================================================================
// Write Gateway
// =============================================================================

/// Validates and executes tag writes.
pub struct WriteGateway {
    registry: Arc<TagRegistry>,
    supervisor: Arc<ConnectionSupervisor>,
    stats: StatsInner,
}

impl WriteGateway {
    /// Creates a gateway over the given registry and supervisor.
    pub fn new(registry: Arc<TagRegistry>, supervisor: Arc<ConnectionSupervisor>) -> Self {
        Self {
            registry,
            supervisor,
            stats: StatsInner::default(),
        }
    }

    /// Writes a value to a named tag.
    ///
    /// See the [module documentation](self) for the validation order.
    /// On success exactly one write went over the wire; on any error,
    /// at most one.
    pub async fn write(&self, tag_name: &str, value: WriteValue) -> Result<(), WriteError> {
        let result = self.write_inner(tag_name, &value).await;
        if let Err(err) = &result {
            match err {
                WriteError::UnknownTag { .. }
                | WriteError::ReadOnly { .. }
                | WriteError::TypeMismatch { .. } => {
                    self.stats.writes_rejected.fetch_add(1, Ordering::Relaxed);
                    warn!(tag = %tag_name, value = %value, error = %err, "Write rejected");
                }
                _ => {
                    self.stats.write_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(tag = %tag_name, value = %value, error = %err, "Write failed");
                }
            }
        }
        result
    }

    async fn write_inner(&self, tag_name: &str, value: &WriteValue) -> Result<(), WriteError> {
        let tag = self
            .registry
            .resolve(tag_name)
            .ok_or_else(|| WriteError::unknown_tag(tag_name))?;

        let payload = encode_payload(&tag, value)?;

        let (region, address) = (tag.region, tag.address);
        self.stats.writes.fetch_add(1, Ordering::Relaxed);

        // The supervisor rejects this without touching the transport
        // when the connection is down; its reconnect schedule is not
        // affected by a write request.
        self.supervisor
            .execute(move |t| t.write(region, address, payload))
            .await?;

        info!(tag = %tag.name, value = %value, "Write completed");
        Ok(())
    }

    /// Returns current statistics.
    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            writes: self.stats.writes.load(Ordering::Relaxed),
            writes_rejected: self.stats.writes_rejected.load(Ordering::Relaxed),
            write_failures: self.stats.write_failures.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for WriteGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteGateway")
            .field("tags", &self.registry.len())
            .field("writes", &self.stats.writes.load(Ordering::Relaxed))
            .finish()
    }
}

// =============================================================================
// Payload encoding
// =============================================================================

/// Validates a value against a tag's shape and encodes the payload.
///
/// Write values are device-domain: a register write carries the raw
/// word, not a display-scaled number. Scaling is a read-side concern.
fn encode_payload(tag: &Tag, value: &WriteValue) -> Result<WritePayload, WriteError> {
    if !tag.region.is_writable() {
        return Err(WriteError::read_only(&tag.name));
    }

    if tag.region.is_bit() {
        match value {
            WriteValue::Bool(b) => Ok(WritePayload::Coil(*b)),
            other => Err(WriteError::type_mismatch(&tag.name, "bool", describe(other))),
        }
    } else if tag.length == 1 {
        match value {
            WriteValue::Number(n) if is_word(*n) => Ok(WritePayload::Register(*n as u16)),
            other => Err(WriteError::type_mismatch(
                &tag.name,
                "integer in 0..=65535",
                describe(other),
            )),
        }
    } else {
        match value {
            WriteValue::Words(words) if words.len() == usize::from(tag.length) => {
                Ok(WritePayload::Registers(words.clone()))
            }
            other => Err(WriteError::type_mismatch(
                &tag.name,
                format!("{} words", tag.length),
                describe(other),
            )),
        }
    }
}

/// Whether a number is exactly representable as a register word.
fn is_word(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && (0.0..=65535.0).contains(&n)
}

/// Describes a submitted value for mismatch messages.
fn describe(value: &WriteValue) -> String {
    match value {
        WriteValue::Bool(b) => format!("bool {}", b),
        WriteValue::Number(n) => format!("number {}", n),
        WriteValue::Words(words) => format!("{} words", words.len()),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::supervisor::SupervisorConfig;
    use crate::transport::Transport;
    use crate::types::{ConnectionState, Region, RegisterValues};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    /// Captures writes and serves scripted failures.
    #[derive(Default)]
    struct ProbeState {
        captured: StdMutex<Vec<(Region, u16, WritePayload)>>,
        write_results: StdMutex<VecDeque<Result<(), TransportError>>>,
        write_calls: AtomicUsize,
    }

    struct WriteProbe {
        state: Arc<ProbeState>,
        connected: bool,
    }

    #[async_trait]
    impl Transport for WriteProbe {
        async fn connect(&mut self) -> Result<(), TransportError> {
            self.connected = true;
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<(), TransportError> {
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn read(
            &mut self,
            _region: Region,
            _address: u16,
            count: u16,
        ) -> Result<RegisterValues, TransportError> {
            Ok(RegisterValues::Words(vec![0; count as usize]))
        }

        async fn write(
            &mut self,
            region: Region,
            address: u16,
            payload: WritePayload,
        ) -> Result<(), TransportError> {
            self.state.write_calls.fetch_add(1, Ordering::SeqCst);
            let result = self
                .state
                .write_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()));
            if result.is_ok() {
                self.state
                    .captured
                    .lock()
                    .unwrap()
                    .push((region, address, payload));
            }
            if matches!(&result, Err(e) if e.is_connection_lost()) {
                self.connected = false;
            }
            result
        }

        fn endpoint(&self) -> String {
            "probe:0".to_string()
        }
    }

    fn sample_tags() -> Vec<Tag> {
        vec![
            Tag::new("motor_running", Region::Coil, 0),
            Tag::new("setpoint", Region::HoldingRegister, 10).with_scale(0.1),
            Tag::new("recipe", Region::HoldingRegister, 20)
                .with_length(3)
                .with_polled(false),
            Tag::new("door_open", Region::DiscreteInput, 5),
            Tag::new("line_voltage", Region::InputRegister, 30),
        ]
    }

    async fn gateway_over(
        state: &Arc<ProbeState>,
        connect: bool,
    ) -> (WriteGateway, Arc<ConnectionSupervisor>) {
        let registry = Arc::new(TagRegistry::new(sample_tags()).unwrap());
        let transport = Box::new(WriteProbe {
            state: state.clone(),
            connected: false,
        });
        let supervisor = Arc::new(ConnectionSupervisor::new(
            transport,
            SupervisorConfig::default().with_auto_reconnect(false),
        ));
        if connect {
            supervisor.request_connect().await.unwrap();
        }
        (WriteGateway::new(registry, supervisor.clone()), supervisor)
    }

    #[tokio::test]
    async fn test_unknown_tag_rejected() {
        let state = Arc::new(ProbeState::default());
        let (gateway, _supervisor) = gateway_over(&state, true).await;

        let err = gateway
            .write("nonexistent", WriteValue::Bool(true))
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::UnknownTag { name } if name == "nonexistent"));
        assert_eq!(state.write_calls.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.stats().writes_rejected, 1);
    }

    #[tokio::test]
    async fn test_read_only_regions_rejected() {
        let state = Arc::new(ProbeState::default());
        let (gateway, _supervisor) = gateway_over(&state, true).await;

        for tag in ["door_open", "line_voltage"] {
            let err = gateway.write(tag, WriteValue::Number(1.0)).await.unwrap_err();
            assert!(matches!(err, WriteError::ReadOnly { .. }));
        }
        assert_eq!(state.write_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_coil_write_encodes_payload() {
        let state = Arc::new(ProbeState::default());
        let (gateway, _supervisor) = gateway_over(&state, true).await;

        gateway.write("motor_running", WriteValue::Bool(true)).await.unwrap();

        let captured = state.captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0], (Region::Coil, 0, WritePayload::Coil(true)));
    }

    #[tokio::test]
    async fn test_number_to_coil_is_type_mismatch() {
        let state = Arc::new(ProbeState::default());
        let (gateway, _supervisor) = gateway_over(&state, true).await;

        // Even a clean 1.0 is not a bool.
        for value in [WriteValue::Number(3.5), WriteValue::Number(1.0)] {
            let err = gateway.write("motor_running", value).await.unwrap_err();
            assert!(matches!(err, WriteError::TypeMismatch { .. }));
        }
        assert_eq!(state.write_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_register_write_is_raw_unscaled() {
        let state = Arc::new(ProbeState::default());
        let (gateway, _supervisor) = gateway_over(&state, true).await;

        // The tag scales reads by 0.1; writes carry the raw word.
        gateway.write("setpoint", WriteValue::Number(250.0)).await.unwrap();

        let captured = state.captured.lock().unwrap();
        assert_eq!(
            captured[0],
            (Region::HoldingRegister, 10, WritePayload::Register(250))
        );
    }

    #[tokio::test]
    async fn test_register_rejects_non_word_numbers() {
        let state = Arc::new(ProbeState::default());
        let (gateway, _supervisor) = gateway_over(&state, true).await;

        for value in [
            WriteValue::Number(3.5),
            WriteValue::Number(-1.0),
            WriteValue::Number(65536.0),
            WriteValue::Number(f64::NAN),
            WriteValue::Number(f64::INFINITY),
            WriteValue::Bool(true),
        ] {
            let err = gateway.write("setpoint", value).await.unwrap_err();
            assert!(matches!(err, WriteError::TypeMismatch { .. }));
        }
        assert_eq!(state.write_calls.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.stats().writes_rejected, 6);
    }

    #[tokio::test]
    async fn test_block_write_requires_exact_length() {
        let state = Arc::new(ProbeState::default());
        let (gateway, _supervisor) = gateway_over(&state, true).await;

        let err = gateway
            .write("recipe", WriteValue::Words(vec![1, 2]))
            .await
            .unwrap_err();
        assert!(
            matches!(err, WriteError::TypeMismatch { ref expected, .. } if expected == "3 words")
        );

        gateway
            .write("recipe", WriteValue::Words(vec![1, 2, 3]))
            .await
            .unwrap();
        let captured = state.captured.lock().unwrap();
        assert_eq!(
            captured[0],
            (
                Region::HoldingRegister,
                20,
                WritePayload::Registers(vec![1, 2, 3])
            )
        );
    }

    #[tokio::test]
    async fn test_disconnected_write_never_touches_transport() {
        let state = Arc::new(ProbeState::default());
        let (gateway, _supervisor) = gateway_over(&state, false).await;

        let err = gateway
            .write("motor_running", WriteValue::Bool(true))
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::NotConnected));
        assert_eq!(state.write_calls.load(Ordering::SeqCst), 0);

        // Validation still runs first: a bad value on a dead connection
        // reports the mismatch, not the connection.
        let err = gateway
            .write("motor_running", WriteValue::Number(3.5))
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::TypeMismatch { .. }));
    }

    #[tokio::test]
    async fn test_device_rejection_is_protocol_error() {
        let state = Arc::new(ProbeState::default());
        state
            .write_results
            .lock()
            .unwrap()
            .push_back(Err(TransportError::exception(0x02)));

        let (gateway, supervisor) = gateway_over(&state, true).await;

        let err = gateway
            .write("setpoint", WriteValue::Number(100.0))
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::Protocol { code: 0x02, .. }));

        // A rejection is not a disconnection.
        assert_eq!(supervisor.current_state(), ConnectionState::Connected);
        assert_eq!(gateway.stats().write_failures, 1);
    }

    #[tokio::test]
    async fn test_lost_connection_during_write() {
        let state = Arc::new(ProbeState::default());
        state
            .write_results
            .lock()
            .unwrap()
            .push_back(Err(TransportError::connection_lost("peer reset")));

        let (gateway, supervisor) = gateway_over(&state, true).await;

        let err = gateway
            .write("motor_running", WriteValue::Bool(false))
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::Transport(ref e) if e.is_connection_lost()));
        assert_eq!(supervisor.current_state(), ConnectionState::Disconnected);

        // No retry happened.
        assert_eq!(state.write_calls.load(Ordering::SeqCst), 1);
    }
}
