// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types for the Gauge HMI data core.
//!
//! This module defines the vocabulary shared by every component:
//! Modbus regions, tags, connection states, raw and scaled values,
//! and the published `PolledValue` record consumed by display
//! collaborators.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Region
// =============================================================================

/// The four Modbus addressing regions.
///
/// Coils and discrete inputs are single-bit; holding and input registers
/// are 16-bit words. Discrete inputs and input registers are read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    /// Single-bit read/write output (function codes 01 read, 05 write).
    Coil,
    /// Single-bit read-only input (function code 02).
    DiscreteInput,
    /// 16-bit read/write register (function codes 03 read, 06/16 write).
    HoldingRegister,
    /// 16-bit read-only register (function code 04).
    InputRegister,
}

impl Region {
    /// Returns `true` for the single-bit regions (coils, discrete inputs).
    pub fn is_bit(&self) -> bool {
        matches!(self, Region::Coil | Region::DiscreteInput)
    }

    /// Returns `true` if the region accepts writes.
    pub fn is_writable(&self) -> bool {
        matches!(self, Region::Coil | Region::HoldingRegister)
    }

    /// Maximum item count for a single read request.
    ///
    /// 2000 bits or 125 words, per the Modbus application protocol limits.
    pub fn max_read_count(&self) -> u16 {
        if self.is_bit() {
            2000
        } else {
            125
        }
    }

    /// Short code used in logs and tables ("C", "DI", "HR", "IR").
    pub fn short_name(&self) -> &'static str {
        match self {
            Region::Coil => "C",
            Region::DiscreteInput => "DI",
            Region::HoldingRegister => "HR",
            Region::InputRegister => "IR",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Region::Coil => "coil",
            Region::DiscreteInput => "discrete_input",
            Region::HoldingRegister => "holding_register",
            Region::InputRegister => "input_register",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Tag
// =============================================================================

/// A named binding to one Modbus address with type and scaling metadata.
///
/// Tags are declared in configuration, validated into a
/// [`TagRegistry`](crate::registry::TagRegistry), and immutable from then
/// on. `scale` applies to the read path only: a register value published
/// for display is `raw * scale`. Writes carry device-domain (raw) values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Unique tag name, e.g. `"temperature"`.
    pub name: String,
    /// Addressing region this tag lives in.
    pub region: Region,
    /// Start address within the region.
    pub address: u16,
    /// Item count (bits or words). Display tags are typically 1; blocks
    /// larger than 1 are used for multi-register writes.
    pub length: u16,
    /// Multiplier applied to raw register words on the read path.
    pub scale: f64,
    /// Engineering unit for display, e.g. `"°C"`.
    pub unit: Option<String>,
    /// Whether the poller includes this tag in its cycles.
    pub polled: bool,
}

impl Tag {
    /// Creates a tag with defaults: length 1, scale 1.0, no unit, polled.
    pub fn new(name: impl Into<String>, region: Region, address: u16) -> Self {
        Self {
            name: name.into(),
            region,
            address,
            length: 1,
            scale: 1.0,
            unit: None,
            polled: true,
        }
    }

    /// Sets the item count.
    pub fn with_length(mut self, length: u16) -> Self {
        self.length = length;
        self
    }

    /// Sets the read-path scale factor.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the engineering unit.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Marks the tag as polled or not.
    pub fn with_polled(mut self, polled: bool) -> Self {
        self.polled = polled;
        self
    }

    /// Exclusive end address (`address + length`), widened to avoid
    /// overflow at the top of the address space.
    pub fn end_address(&self) -> u32 {
        self.address as u32 + self.length as u32
    }

    /// Returns `true` if this tag's address range intersects `other`'s
    /// within the same region.
    pub fn overlaps(&self, other: &Tag) -> bool {
        self.region == other.region
            && (self.address as u32) < other.end_address()
            && (other.address as u32) < self.end_address()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}{})", self.name, self.region.short_name(), self.address)
    }
}

// =============================================================================
// Connection State
// =============================================================================

/// Lifecycle state of the supervised PLC connection.
///
/// Valid transitions:
///
/// ```text
/// Disconnected --connect--> Connecting --ok--> Connected
/// Connecting --err--> Disconnected
/// Connected --connection lost--> Disconnected
/// Disconnected --auto-reconnect armed--> ReconnectWaiting --delay--> Connecting
/// ```
///
/// `Connecting` is never skipped on the way from `Disconnected` to
/// `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection, and no attempt in progress.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// Connection established; reads and writes are admitted.
    Connected,
    /// Waiting out the fixed delay before the next reconnect attempt.
    ReconnectWaiting,
}

impl ConnectionState {
    /// Returns `true` only for [`ConnectionState::Connected`].
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::ReconnectWaiting => "ReconnectWaiting",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Transport payloads
// =============================================================================

/// Values returned by a transport read: bits for coil/discrete-input
/// regions, words for register regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterValues {
    /// Coil or discrete input bits.
    Bits(Vec<bool>),
    /// Holding or input register words.
    Words(Vec<u16>),
}

impl RegisterValues {
    /// Number of items carried.
    pub fn len(&self) -> usize {
        match self {
            RegisterValues::Bits(b) => b.len(),
            RegisterValues::Words(w) => w.len(),
        }
    }

    /// Returns `true` if no items are carried.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Payload for a transport write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WritePayload {
    /// Write a single coil (function code 05).
    Coil(bool),
    /// Write a single holding register (function code 06).
    Register(u16),
    /// Write a block of holding registers (function code 16).
    Registers(Vec<u16>),
}

impl WritePayload {
    /// Number of items to be written.
    pub fn count(&self) -> u16 {
        match self {
            WritePayload::Coil(_) | WritePayload::Register(_) => 1,
            WritePayload::Registers(words) => words.len() as u16,
        }
    }
}

// =============================================================================
// Raw and scaled values
// =============================================================================

/// A value as read from the device, before scaling.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Bit regions.
    Bool(bool),
    /// Single-word register tags.
    Word(u16),
    /// Multi-word register tags (length > 1).
    Words(Vec<u16>),
}

impl RawValue {
    /// Region-appropriate zero value, used before the first successful
    /// read of a tag.
    pub fn zero_for(tag: &Tag) -> Self {
        if tag.region.is_bit() {
            RawValue::Bool(false)
        } else if tag.length > 1 {
            RawValue::Words(vec![0; tag.length as usize])
        } else {
            RawValue::Word(0)
        }
    }
}

/// A value after scaling, in display domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaledValue {
    /// Bit regions pass through unscaled.
    Bool(bool),
    /// Register words scaled by the tag's factor.
    Number(f64),
}

impl ScaledValue {
    /// Returns the boolean value, if this is a bit value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScaledValue::Bool(b) => Some(*b),
            ScaledValue::Number(_) => None,
        }
    }

    /// Returns the numeric value; booleans map to 0.0 / 1.0.
    pub fn as_f64(&self) -> f64 {
        match self {
            ScaledValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            ScaledValue::Number(n) => *n,
        }
    }

    /// Region-appropriate zero value.
    pub fn zero_for(tag: &Tag) -> Self {
        if tag.region.is_bit() {
            ScaledValue::Bool(false)
        } else {
            ScaledValue::Number(0.0)
        }
    }
}

impl fmt::Display for ScaledValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaledValue::Bool(b) => write!(f, "{}", b),
            ScaledValue::Number(n) => write!(f, "{}", n),
        }
    }
}

// =============================================================================
// PolledValue
// =============================================================================

/// One tag's published value for one poll cycle.
///
/// Produced exclusively by the poller. When a cycle fails, the previous
/// raw/scaled values are retained and republished with `valid = false`,
/// so display collaborators keep showing the last known good value
/// instead of flickering to a blank.
#[derive(Debug, Clone, PartialEq)]
pub struct PolledValue {
    /// The tag this value belongs to.
    pub tag: Arc<Tag>,
    /// Device-domain value from the last successful read.
    pub raw: RawValue,
    /// Display-domain value (`raw * scale` for registers).
    pub scaled: ScaledValue,
    /// When this record was published.
    pub timestamp: DateTime<Utc>,
    /// `false` when the most recent poll attempt for this tag failed.
    pub valid: bool,
}

impl PolledValue {
    /// Initial record for a tag that has never been read successfully.
    pub fn initial(tag: Arc<Tag>, timestamp: DateTime<Utc>) -> Self {
        let raw = RawValue::zero_for(&tag);
        let scaled = ScaledValue::zero_for(&tag);
        Self {
            tag,
            raw,
            scaled,
            timestamp,
            valid: false,
        }
    }

    /// Re-publication of this record after a failed poll attempt: same
    /// raw/scaled values, fresh timestamp, `valid = false`.
    pub fn invalidated(&self, timestamp: DateTime<Utc>) -> Self {
        Self {
            tag: self.tag.clone(),
            raw: self.raw.clone(),
            scaled: self.scaled,
            timestamp,
            valid: false,
        }
    }
}

// =============================================================================
// WriteValue
// =============================================================================

/// A value submitted to the write gateway by a collaborator.
///
/// Deliberately wider than what any single tag accepts: validation
/// against the tag's region and length happens in the gateway, so a
/// caller passing `3.5` to a coil tag gets a typed mismatch error
/// rather than a silent coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteValue {
    /// Boolean, for coil tags.
    Bool(bool),
    /// Numeric, for single-register tags; must be an integer in u16
    /// range (write values are raw, not display-scaled).
    Number(f64),
    /// Word block, for multi-register tags.
    Words(Vec<u16>),
}

impl WriteValue {
    /// Short type description used in mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            WriteValue::Bool(_) => "bool",
            WriteValue::Number(_) => "number",
            WriteValue::Words(_) => "words",
        }
    }
}

impl fmt::Display for WriteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteValue::Bool(b) => write!(f, "{}", b),
            WriteValue::Number(n) => write!(f, "{}", n),
            WriteValue::Words(words) => write!(f, "{:?}", words),
        }
    }
}

impl From<bool> for WriteValue {
    fn from(v: bool) -> Self {
        WriteValue::Bool(v)
    }
}

impl From<u16> for WriteValue {
    fn from(v: u16) -> Self {
        WriteValue::Number(v as f64)
    }
}

impl From<f64> for WriteValue {
    fn from(v: f64) -> Self {
        WriteValue::Number(v)
    }
}

impl From<Vec<u16>> for WriteValue {
    fn from(v: Vec<u16>) -> Self {
        WriteValue::Words(v)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_properties() {
        assert!(Region::Coil.is_bit());
        assert!(Region::Coil.is_writable());
        assert!(Region::DiscreteInput.is_bit());
        assert!(!Region::DiscreteInput.is_writable());
        assert!(!Region::HoldingRegister.is_bit());
        assert!(Region::HoldingRegister.is_writable());
        assert!(!Region::InputRegister.is_writable());

        assert_eq!(Region::Coil.max_read_count(), 2000);
        assert_eq!(Region::InputRegister.max_read_count(), 125);
        assert_eq!(Region::HoldingRegister.short_name(), "HR");
    }

    #[test]
    fn test_tag_builder() {
        let tag = Tag::new("temperature", Region::HoldingRegister, 100)
            .with_scale(0.1)
            .with_unit("°C");

        assert_eq!(tag.name, "temperature");
        assert_eq!(tag.address, 100);
        assert_eq!(tag.length, 1);
        assert_eq!(tag.scale, 0.1);
        assert_eq!(tag.unit.as_deref(), Some("°C"));
        assert!(tag.polled);
        assert_eq!(tag.to_string(), "temperature (HR100)");
    }

    #[test]
    fn test_tag_overlap() {
        let a = Tag::new("a", Region::HoldingRegister, 100).with_length(4);
        let b = Tag::new("b", Region::HoldingRegister, 103);
        let c = Tag::new("c", Region::HoldingRegister, 104);
        let d = Tag::new("d", Region::Coil, 100);

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        // Different regions never overlap.
        assert!(!a.overlaps(&d));
    }

    #[test]
    fn test_tag_end_address_at_top_of_space() {
        let tag = Tag::new("top", Region::HoldingRegister, u16::MAX);
        assert_eq!(tag.end_address(), 65536);
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Disconnected.to_string(), "Disconnected");
        assert_eq!(ConnectionState::ReconnectWaiting.to_string(), "ReconnectWaiting");
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
    }

    #[test]
    fn test_scaled_value_accessors() {
        assert_eq!(ScaledValue::Bool(true).as_bool(), Some(true));
        assert_eq!(ScaledValue::Number(25.0).as_bool(), None);
        assert_eq!(ScaledValue::Bool(true).as_f64(), 1.0);
        assert_eq!(ScaledValue::Number(25.0).as_f64(), 25.0);
    }

    #[test]
    fn test_polled_value_initial_and_invalidated() {
        let tag = Arc::new(Tag::new("motor_running", Region::Coil, 0));
        let t0 = Utc::now();
        let initial = PolledValue::initial(tag.clone(), t0);

        assert!(!initial.valid);
        assert_eq!(initial.raw, RawValue::Bool(false));
        assert_eq!(initial.scaled, ScaledValue::Bool(false));

        let good = PolledValue {
            tag,
            raw: RawValue::Bool(true),
            scaled: ScaledValue::Bool(true),
            timestamp: t0,
            valid: true,
        };
        let t1 = Utc::now();
        let stale = good.invalidated(t1);

        assert!(!stale.valid);
        assert_eq!(stale.raw, RawValue::Bool(true));
        assert_eq!(stale.scaled, ScaledValue::Bool(true));
        assert_eq!(stale.timestamp, t1);
    }

    #[test]
    fn test_raw_value_zero_for_block_tag() {
        let block = Tag::new("recipe", Region::HoldingRegister, 300).with_length(3);
        assert_eq!(RawValue::zero_for(&block), RawValue::Words(vec![0, 0, 0]));
    }

    #[test]
    fn test_write_value_conversions() {
        assert_eq!(WriteValue::from(true), WriteValue::Bool(true));
        assert_eq!(WriteValue::from(42u16), WriteValue::Number(42.0));
        assert_eq!(WriteValue::from(3.5), WriteValue::Number(3.5));
        assert_eq!(WriteValue::from(vec![1u16, 2]).kind(), "words");
    }
}
