// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Transport abstraction for one Modbus connection.
//!
//! A [`Transport`] owns the socket lifecycle for a single PLC unit and
//! executes one protocol operation at a time. It performs no retries
//! and holds no reconnect policy; both belong to the connection
//! supervisor, which owns the transport exclusively and serializes all
//! access to it.
//!
//! # Contract
//!
//! - `connect` / `disconnect` are idempotent.
//! - A [`TransportError::ConnectionLost`] from any operation means the
//!   connection is dead; the implementation must discard its protocol
//!   context so the connection cannot be reused.
//! - Every operation honors the implementation's configured timeout and
//!   fails with [`TransportError::Timeout`] when it elapses.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn probe(t: &mut dyn Transport) -> Result<(), TransportError> {
//!     t.connect().await?;
//!     let values = t.read(Region::HoldingRegister, 100, 1).await?;
//!     println!("read {:?}", values);
//!     t.disconnect().await
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::types::{Region, RegisterValues, WritePayload};

/// Boxed future returned by transport operations.
///
/// This matches the return shape of the trait's async methods, so a
/// supervisor caller can pass `|t| t.read(region, address, count)`
/// straight through without re-boxing.
pub type TransportOp<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// One Modbus connection to one PLC unit.
///
/// Implementations are driven from a single owner; methods take
/// `&mut self` and need no internal locking.
#[async_trait]
pub trait Transport: Send {
    /// Establishes the connection. A no-op when already connected.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Closes the connection, best-effort. A no-op when already
    /// disconnected.
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Returns `true` while a usable connection is held.
    fn is_connected(&self) -> bool;

    /// Reads `count` items starting at `address` in `region`.
    ///
    /// Returns bits for coil/discrete-input regions and words for
    /// register regions.
    async fn read(
        &mut self,
        region: Region,
        address: u16,
        count: u16,
    ) -> Result<RegisterValues, TransportError>;

    /// Writes a single coil, a single register, or a register block at
    /// `address`.
    ///
    /// Read-only regions fail with a protocol error; the payload kind
    /// is validated against the region by the write gateway before this
    /// is ever called.
    async fn write(
        &mut self,
        region: Region,
        address: u16,
        payload: WritePayload,
    ) -> Result<(), TransportError>;

    /// Display name for logs, e.g. `"10.0.0.5:502#1"`.
    fn endpoint(&self) -> String;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Minimal in-memory transport used to pin down the trait-object
    /// and boxed-future ergonomics the supervisor relies on.
    struct FixedTransport {
        connected: AtomicBool,
        word: u16,
    }

    impl FixedTransport {
        fn new(word: u16) -> Self {
            Self {
                connected: AtomicBool::new(false),
                word,
            }
        }
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn connect(&mut self) -> Result<(), TransportError> {
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<(), TransportError> {
            self.connected.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn read(
            &mut self,
            region: Region,
            _address: u16,
            count: u16,
        ) -> Result<RegisterValues, TransportError> {
            if !self.is_connected() {
                return Err(TransportError::connection_lost("not connected"));
            }
            Ok(if region.is_bit() {
                RegisterValues::Bits(vec![true; count as usize])
            } else {
                RegisterValues::Words(vec![self.word; count as usize])
            })
        }

        async fn write(
            &mut self,
            _region: Region,
            _address: u16,
            _payload: WritePayload,
        ) -> Result<(), TransportError> {
            if !self.is_connected() {
                return Err(TransportError::connection_lost("not connected"));
            }
            Ok(())
        }

        fn endpoint(&self) -> String {
            "fixed".to_string()
        }
    }

    #[tokio::test]
    async fn test_trait_object_lifecycle() {
        let mut boxed: Box<dyn Transport> = Box::new(FixedTransport::new(250));

        assert!(!boxed.is_connected());
        boxed.connect().await.unwrap();
        assert!(boxed.is_connected());

        let values = boxed.read(Region::HoldingRegister, 100, 2).await.unwrap();
        assert_eq!(values, RegisterValues::Words(vec![250, 250]));

        boxed.disconnect().await.unwrap();
        assert!(!boxed.is_connected());
    }

    #[tokio::test]
    async fn test_method_future_matches_transport_op() {
        let mut t = FixedTransport::new(7);
        t.connect().await.unwrap();

        // The async-trait method return type is exactly TransportOp, so
        // closures handed to the supervisor need no extra boxing.
        let dyn_ref: &mut dyn Transport = &mut t;
        let op: TransportOp<'_, RegisterValues> = dyn_ref.read(Region::Coil, 0, 1);
        let values = op.await.unwrap();
        assert_eq!(values, RegisterValues::Bits(vec![true]));
    }

    #[tokio::test]
    async fn test_read_when_disconnected_is_connection_lost() {
        let mut t = FixedTransport::new(0);
        let err = t.read(Region::InputRegister, 0, 1).await.unwrap_err();
        assert!(err.is_connection_lost());
    }
}
