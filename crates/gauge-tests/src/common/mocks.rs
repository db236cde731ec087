// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! Mock objects for testing the data core without a real PLC.
//!
//! The central piece is [`MockTransport`], an in-memory Modbus device
//! implementing the [`Transport`] trait. It serves reads from a register
//! store, applies writes back to it, and injects faults on demand:
//! refused connections, protocol exceptions, timeouts, and dropped
//! connections.
//!
//! ## Design Principles
//!
//! - Configurable behavior for different test scenarios
//! - Call tracking for verification
//! - Thread-safe for concurrent test execution

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};

use gauge_core::{
    ConnectionState, ConnectionSupervisor, Region, RegisterValues, Transport, TransportError,
    WritePayload,
};

/// Exception code injected into failing reads (illegal data address).
pub const READ_EXCEPTION_CODE: u8 = 0x02;

/// Exception code injected into failing writes (illegal data value).
pub const WRITE_EXCEPTION_CODE: u8 = 0x03;

/// Timeout reported by a read armed with [`MockTransport::timeout_next_read`].
const SIMULATED_TIMEOUT: Duration = Duration::from_millis(100);

// =============================================================================
// Mock Transport
// =============================================================================

/// One recorded write, in the order the device received it.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    /// Region the write targeted.
    pub region: Region,
    /// Start address of the write.
    pub address: u16,
    /// The payload as handed to the transport.
    pub payload: WritePayload,
}

/// Shared state behind [`MockTransport`] clones.
#[derive(Debug, Default)]
struct MockState {
    endpoint: String,

    connected: AtomicBool,

    // Fault injection
    fail_connection: AtomicBool,
    fail_next_connect: AtomicBool,
    fail_next_read: AtomicBool,
    fail_all_reads: AtomicBool,
    fail_next_write: AtomicBool,
    drop_next_read: AtomicBool,
    timeout_next_read: AtomicBool,

    // Call tracking
    connect_count: AtomicU64,
    disconnect_count: AtomicU64,
    read_count: AtomicU64,
    write_count: AtomicU64,

    // Concurrency tracking
    in_flight: AtomicU64,
    max_in_flight: AtomicU64,

    /// Register store, one cell per (region, address). Bit regions store
    /// 0 or 1.
    cells: Mutex<HashMap<(Region, u16), u16>>,
    /// Writes in arrival order.
    write_history: Mutex<Vec<WriteRecord>>,
    /// Virtual timestamps of connect attempts, for pacing assertions.
    connect_times: Mutex<Vec<tokio::time::Instant>>,
    /// Artificial round-trip delay applied to reads and writes.
    op_delay: Mutex<Duration>,
}

/// Decrements the in-flight counter on every exit path.
struct InFlightGuard<'a> {
    state: &'a MockState,
}

impl<'a> InFlightGuard<'a> {
    fn enter(state: &'a MockState) -> Self {
        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self { state }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory Modbus device implementing [`Transport`].
///
/// Clones share one device: hand one clone to the supervisor and keep
/// another in the test for seeding registers, injecting faults, and
/// inspecting call counts.
///
/// # Example
///
/// ```rust,ignore
/// let mock = MockTransport::new();
/// mock.set_word(Region::HoldingRegister, 100, 235).await;
///
/// let supervisor = ConnectionSupervisor::new(Box::new(mock.clone()), config);
/// supervisor.request_connect().await?;
/// // ... exercise the stack, then:
/// assert_eq!(mock.read_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a disconnected device with an empty register store.
    pub fn new() -> Self {
        Self::with_endpoint("mock-plc:502#1")
    }

    /// Create a device with a specific endpoint string.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            state: Arc::new(MockState {
                endpoint: endpoint.into(),
                ..MockState::default()
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Register store
    // -------------------------------------------------------------------------

    /// Set a single word cell.
    pub async fn set_word(&self, region: Region, address: u16, word: u16) {
        self.state.cells.lock().await.insert((region, address), word);
    }

    /// Set a run of consecutive word cells starting at `address`.
    pub async fn set_words(&self, region: Region, address: u16, words: &[u16]) {
        let mut cells = self.state.cells.lock().await;
        for (offset, word) in words.iter().enumerate() {
            cells.insert((region, address + offset as u16), *word);
        }
    }

    /// Set a single bit cell.
    pub async fn set_bit(&self, region: Region, address: u16, value: bool) {
        self.state
            .cells
            .lock()
            .await
            .insert((region, address), u16::from(value));
    }

    /// Read back a word cell, if it was ever written.
    pub async fn word_at(&self, region: Region, address: u16) -> Option<u16> {
        self.state.cells.lock().await.get(&(region, address)).copied()
    }

    /// Read back a bit cell, if it was ever written.
    pub async fn bit_at(&self, region: Region, address: u16) -> Option<bool> {
        self.state
            .cells
            .lock()
            .await
            .get(&(region, address))
            .map(|w| *w != 0)
    }

    // -------------------------------------------------------------------------
    // Fault injection
    // -------------------------------------------------------------------------

    /// While set, every connect attempt fails.
    pub fn set_fail_connection(&self, fail: bool) {
        self.state.fail_connection.store(fail, Ordering::SeqCst);
    }

    /// The next connect attempt fails, then the flag clears.
    pub fn fail_next_connect(&self) {
        self.state.fail_next_connect.store(true, Ordering::SeqCst);
    }

    /// The next read fails with a protocol exception, then the flag clears.
    pub fn fail_next_read(&self) {
        self.state.fail_next_read.store(true, Ordering::SeqCst);
    }

    /// While set, every read fails with a protocol exception.
    pub fn set_fail_all_reads(&self, fail: bool) {
        self.state.fail_all_reads.store(fail, Ordering::SeqCst);
    }

    /// The next write fails with a protocol exception, then the flag clears.
    pub fn fail_next_write(&self) {
        self.state.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// The next read reports a lost connection and drops the link.
    pub fn drop_next_read(&self) {
        self.state.drop_next_read.store(true, Ordering::SeqCst);
    }

    /// The next read reports a timeout. The connection stays up.
    pub fn timeout_next_read(&self) {
        self.state.timeout_next_read.store(true, Ordering::SeqCst);
    }

    /// Artificial round-trip delay applied to every read and write.
    pub async fn set_op_delay(&self, delay: Duration) {
        *self.state.op_delay.lock().await = delay;
    }

    /// Clear all fault flags, call counters, and the write history. The
    /// register store and connection state are left as-is.
    pub async fn reset(&self) {
        let s = &self.state;
        s.fail_connection.store(false, Ordering::SeqCst);
        s.fail_next_connect.store(false, Ordering::SeqCst);
        s.fail_next_read.store(false, Ordering::SeqCst);
        s.fail_all_reads.store(false, Ordering::SeqCst);
        s.fail_next_write.store(false, Ordering::SeqCst);
        s.drop_next_read.store(false, Ordering::SeqCst);
        s.timeout_next_read.store(false, Ordering::SeqCst);
        s.connect_count.store(0, Ordering::SeqCst);
        s.disconnect_count.store(0, Ordering::SeqCst);
        s.read_count.store(0, Ordering::SeqCst);
        s.write_count.store(0, Ordering::SeqCst);
        s.max_in_flight.store(0, Ordering::SeqCst);
        s.write_history.lock().await.clear();
        s.connect_times.lock().await.clear();
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Connect attempts, successful or not.
    pub fn connect_count(&self) -> u64 {
        self.state.connect_count.load(Ordering::SeqCst)
    }

    /// Disconnect calls.
    pub fn disconnect_count(&self) -> u64 {
        self.state.disconnect_count.load(Ordering::SeqCst)
    }

    /// Read calls that reached the device.
    pub fn read_count(&self) -> u64 {
        self.state.read_count.load(Ordering::SeqCst)
    }

    /// Write calls that reached the device.
    pub fn write_count(&self) -> u64 {
        self.state.write_count.load(Ordering::SeqCst)
    }

    /// Highest number of reads/writes ever in flight at once. Stays at 1
    /// while callers are properly serialized.
    pub fn max_in_flight(&self) -> u64 {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    /// All writes received, in arrival order.
    pub async fn write_history(&self) -> Vec<WriteRecord> {
        self.state.write_history.lock().await.clone()
    }

    /// Timestamps of connect attempts, for reconnect pacing assertions.
    ///
    /// Uses `tokio::time::Instant`, so paused-clock tests observe
    /// virtual time.
    pub async fn connect_times(&self) -> Vec<tokio::time::Instant> {
        self.state.connect_times.lock().await.clone()
    }

    async fn apply_delay(&self) {
        let delay = *self.state.op_delay.lock().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let s = &self.state;
        s.connect_count.fetch_add(1, Ordering::SeqCst);
        s.connect_times.lock().await.push(tokio::time::Instant::now());

        if s.fail_next_connect.swap(false, Ordering::SeqCst)
            || s.fail_connection.load(Ordering::SeqCst)
        {
            return Err(TransportError::connection_lost("connection refused"));
        }

        s.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.state.disconnect_count.fetch_add(1, Ordering::SeqCst);
        self.state.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    async fn read(
        &mut self,
        region: Region,
        address: u16,
        count: u16,
    ) -> Result<RegisterValues, TransportError> {
        let s = &self.state;
        let _guard = InFlightGuard::enter(s);
        self.apply_delay().await;
        s.read_count.fetch_add(1, Ordering::SeqCst);

        if !s.connected.load(Ordering::SeqCst) {
            return Err(TransportError::connection_lost("not connected"));
        }
        if s.drop_next_read.swap(false, Ordering::SeqCst) {
            s.connected.store(false, Ordering::SeqCst);
            return Err(TransportError::connection_lost("peer reset"));
        }
        if s.timeout_next_read.swap(false, Ordering::SeqCst) {
            return Err(TransportError::timeout(SIMULATED_TIMEOUT));
        }
        if s.fail_next_read.swap(false, Ordering::SeqCst)
            || s.fail_all_reads.load(Ordering::SeqCst)
        {
            return Err(TransportError::exception(READ_EXCEPTION_CODE));
        }

        let cells = s.cells.lock().await;
        let values = if region.is_bit() {
            RegisterValues::Bits(
                (0..count)
                    .map(|i| {
                        cells
                            .get(&(region, address + i))
                            .map(|w| *w != 0)
                            .unwrap_or(false)
                    })
                    .collect(),
            )
        } else {
            RegisterValues::Words(
                (0..count)
                    .map(|i| cells.get(&(region, address + i)).copied().unwrap_or(0))
                    .collect(),
            )
        };
        Ok(values)
    }

    async fn write(
        &mut self,
        region: Region,
        address: u16,
        payload: WritePayload,
    ) -> Result<(), TransportError> {
        let s = &self.state;
        let _guard = InFlightGuard::enter(s);
        self.apply_delay().await;
        s.write_count.fetch_add(1, Ordering::SeqCst);

        if !s.connected.load(Ordering::SeqCst) {
            return Err(TransportError::connection_lost("not connected"));
        }
        if s.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(TransportError::exception(WRITE_EXCEPTION_CODE));
        }
        if !region.is_writable() {
            return Err(TransportError::exception(0x01));
        }

        {
            let mut cells = s.cells.lock().await;
            match &payload {
                WritePayload::Coil(bit) => {
                    cells.insert((region, address), u16::from(*bit));
                }
                WritePayload::Register(word) => {
                    cells.insert((region, address), *word);
                }
                WritePayload::Registers(words) => {
                    for (offset, word) in words.iter().enumerate() {
                        cells.insert((region, address + offset as u16), *word);
                    }
                }
            }
        }

        s.write_history.lock().await.push(WriteRecord {
            region,
            address,
            payload,
        });
        Ok(())
    }

    fn endpoint(&self) -> String {
        self.state.endpoint.clone()
    }
}

// =============================================================================
// State Recorder
// =============================================================================

/// Records connection state transitions from a supervisor broadcast.
///
/// Attach the recorder before triggering the transitions under test,
/// then drain with [`wait_for`](Self::wait_for); every state observed
/// since attachment stays available through [`seen`](Self::seen).
pub struct StateRecorder {
    rx: broadcast::Receiver<ConnectionState>,
    seen: Vec<ConnectionState>,
}

impl StateRecorder {
    /// Subscribe to a supervisor's state broadcast.
    pub fn attach(supervisor: &ConnectionSupervisor) -> Self {
        Self {
            rx: supervisor.subscribe_state(),
            seen: Vec::new(),
        }
    }

    /// Receive the next transition.
    ///
    /// # Panics
    /// Panics if the supervisor is gone or the recorder lagged behind.
    pub async fn next(&mut self) -> ConnectionState {
        let state = self.rx.recv().await.expect("state channel closed");
        self.seen.push(state);
        state
    }

    /// Drain transitions until `target` arrives, returning everything
    /// seen since attachment, in order.
    pub async fn wait_for(&mut self, target: ConnectionState) -> Vec<ConnectionState> {
        loop {
            if self.next().await == target {
                return self.seen.clone();
            }
        }
    }

    /// All transitions observed so far.
    pub fn seen(&self) -> &[ConnectionState] {
        &self.seen
    }

    /// Forget the transitions observed so far. Pending broadcasts are
    /// kept.
    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================
