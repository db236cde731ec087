// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error hierarchy for the Gauge data core.
//!
//! Errors flow strictly upward: [`TransportError`] is produced at the
//! wire, wrapped by the supervisor as [`SupervisorError`], and surfaced
//! to collaborators as typed results ([`WriteError`] on the write path;
//! the poller absorbs read failures into invalid published values).
//! Raw transport errors never escape to display collaborators.

use std::time::Duration;

use thiserror::Error;

// =============================================================================
// TransportError
// =============================================================================

/// Errors produced by a Modbus transport operation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// Socket-level failure. The connection is down and must not be
    /// reused; callers treat this as a disconnect.
    #[error("connection lost: {message}")]
    ConnectionLost {
        /// Description of the underlying failure.
        message: String,
    },

    /// The device returned a Modbus exception response. The connection
    /// itself remains usable.
    #[error("device exception {code:#04x}: {message}")]
    Protocol {
        /// Modbus exception code (e.g. 0x02 illegal data address).
        code: u8,
        /// Human-readable exception name.
        message: String,
    },

    /// The operation did not complete within the configured timeout.
    #[error("operation timed out after {timeout:?}")]
    Timeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },
}

impl TransportError {
    /// Creates a [`TransportError::ConnectionLost`].
    pub fn connection_lost(message: impl Into<String>) -> Self {
        Self::ConnectionLost {
            message: message.into(),
        }
    }

    /// Creates a [`TransportError::Protocol`] from a Modbus exception
    /// code, filling in the standard exception name.
    pub fn exception(code: u8) -> Self {
        Self::Protocol {
            code,
            message: exception_name(code).to_string(),
        }
    }

    /// Creates a [`TransportError::Timeout`].
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout }
    }

    /// Returns `true` if the connection must be considered down.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, Self::ConnectionLost { .. })
    }
}

/// Standard name for a Modbus exception code.
pub fn exception_name(code: u8) -> &'static str {
    match code {
        0x01 => "illegal function",
        0x02 => "illegal data address",
        0x03 => "illegal data value",
        0x04 => "server device failure",
        0x05 => "acknowledge",
        0x06 => "server device busy",
        0x08 => "memory parity error",
        0x0A => "gateway path unavailable",
        0x0B => "gateway target device failed to respond",
        _ => "unknown exception",
    }
}

// =============================================================================
// SupervisorError
// =============================================================================

/// Errors surfaced by
/// [`execute`](crate::supervisor::ConnectionSupervisor::execute) to its
/// callers.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SupervisorError {
    /// The connection is not in the `Connected` state; the transport
    /// was not touched.
    #[error("not connected")]
    NotConnected,

    /// A transport operation was attempted and failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SupervisorError {
    /// Returns `true` if the error means no connection is available,
    /// either because admission failed or because the operation itself
    /// lost the connection.
    pub fn is_disconnection(&self) -> bool {
        match self {
            Self::NotConnected => true,
            Self::Transport(t) => t.is_connection_lost(),
        }
    }
}

// =============================================================================
// WriteError
// =============================================================================

/// Errors surfaced by the write gateway to collaborators.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WriteError {
    /// No tag with the given name exists in the registry.
    #[error("unknown tag: {name}")]
    UnknownTag {
        /// The unresolved tag name.
        name: String,
    },

    /// The tag's region does not accept writes.
    #[error("tag {tag} is read-only")]
    ReadOnly {
        /// The tag name.
        tag: String,
    },

    /// The submitted value does not match the tag's declared shape.
    #[error("type mismatch for tag {tag}: expected {expected}, got {got}")]
    TypeMismatch {
        /// The tag name.
        tag: String,
        /// What the tag accepts, e.g. `"bool"` or `"u16 word"`.
        expected: String,
        /// What the caller submitted.
        got: String,
    },

    /// No connection; the transport was not contacted.
    #[error("not connected")]
    NotConnected,

    /// The device rejected the write with an exception response.
    #[error("device rejected write: exception {code:#04x} ({message})")]
    Protocol {
        /// Modbus exception code.
        code: u8,
        /// Human-readable exception name.
        message: String,
    },

    /// The write failed at the socket level.
    #[error("write failed: {0}")]
    Transport(TransportError),
}

impl WriteError {
    /// Creates a [`WriteError::UnknownTag`].
    pub fn unknown_tag(name: impl Into<String>) -> Self {
        Self::UnknownTag { name: name.into() }
    }

    /// Creates a [`WriteError::ReadOnly`].
    pub fn read_only(tag: impl Into<String>) -> Self {
        Self::ReadOnly { tag: tag.into() }
    }

    /// Creates a [`WriteError::TypeMismatch`].
    pub fn type_mismatch(
        tag: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            tag: tag.into(),
            expected: expected.into(),
            got: got.into(),
        }
    }
}

impl From<SupervisorError> for WriteError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::NotConnected => WriteError::NotConnected,
            SupervisorError::Transport(TransportError::Protocol { code, message }) => {
                WriteError::Protocol { code, message }
            }
            SupervisorError::Transport(t) => WriteError::Transport(t),
        }
    }
}

// =============================================================================
// RegistryError
// =============================================================================

/// Errors detected while building a tag registry.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegistryError {
    /// Two tags share one name.
    #[error("duplicate tag name: {name}")]
    DuplicateName {
        /// The duplicated name.
        name: String,
    },

    /// Two polled tags cover overlapping addresses in the same region.
    #[error("polled tags {first} and {second} overlap in region {region}")]
    AddressOverlap {
        /// First tag name, in (region, address) order.
        first: String,
        /// Second tag name.
        second: String,
        /// The shared region.
        region: String,
    },

    /// A tag declares a zero or over-limit item count.
    #[error("tag {tag} has invalid length {length} (limit {limit})")]
    InvalidLength {
        /// The tag name.
        tag: String,
        /// The declared length.
        length: u16,
        /// The per-read protocol limit for the tag's region.
        limit: u16,
    },

    /// A tag's address range runs past the end of the register space.
    #[error("tag {tag} exceeds the address space ({address} + {length} > 65536)")]
    AddressRange {
        /// The tag name.
        tag: String,
        /// The declared start address.
        address: u16,
        /// The declared length.
        length: u16,
    },
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let lost = TransportError::connection_lost("broken pipe");
        assert_eq!(lost.to_string(), "connection lost: broken pipe");
        assert!(lost.is_connection_lost());

        let exc = TransportError::exception(0x02);
        assert_eq!(
            exc.to_string(),
            "device exception 0x02: illegal data address"
        );
        assert!(!exc.is_connection_lost());

        let to = TransportError::timeout(Duration::from_secs(3));
        assert!(to.to_string().contains("timed out"));
    }

    #[test]
    fn test_exception_names() {
        assert_eq!(exception_name(0x01), "illegal function");
        assert_eq!(exception_name(0x03), "illegal data value");
        assert_eq!(exception_name(0x0B), "gateway target device failed to respond");
        assert_eq!(exception_name(0x7F), "unknown exception");
    }

    #[test]
    fn test_supervisor_error_from_transport() {
        let err: SupervisorError = TransportError::connection_lost("reset").into();
        assert!(err.is_disconnection());

        let err: SupervisorError = TransportError::exception(0x04).into();
        assert!(!err.is_disconnection());

        assert!(SupervisorError::NotConnected.is_disconnection());
    }

    #[test]
    fn test_write_error_from_supervisor() {
        assert_eq!(
            WriteError::from(SupervisorError::NotConnected),
            WriteError::NotConnected
        );

        let protocol = SupervisorError::Transport(TransportError::exception(0x03));
        match WriteError::from(protocol) {
            WriteError::Protocol { code, .. } => assert_eq!(code, 0x03),
            other => panic!("expected Protocol, got {:?}", other),
        }

        let lost = SupervisorError::Transport(TransportError::connection_lost("gone"));
        assert!(matches!(WriteError::from(lost), WriteError::Transport(_)));
    }

    #[test]
    fn test_write_error_display() {
        let err = WriteError::type_mismatch("motor_running", "bool", "number (3.5)");
        assert_eq!(
            err.to_string(),
            "type mismatch for tag motor_running: expected bool, got number (3.5)"
        );

        let err = WriteError::unknown_tag("nope");
        assert_eq!(err.to_string(), "unknown tag: nope");
    }
}
