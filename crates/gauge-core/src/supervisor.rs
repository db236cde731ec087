// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Connection supervisor owning the transport.
//!
//! The supervisor is the single entry point to the transport. All
//! transport operations go through [`ConnectionSupervisor::execute`],
//! which serializes them on an internal async mutex, so the poller and
//! the write gateway can share one connection without a request ever
//! interleaving with another on the wire.
//!
//! # State machine
//!
//! ```text
//! Disconnected ──request_connect()──▶ Connecting ──ok──▶ Connected
//!      ▲                                  │                  │
//!      │                                 fail          connection lost
//!      │                                  ▼                  ▼
//!      └◀──────────────────────────── Disconnected ◀─────────┘
//!                                         │
//!                                  auto_reconnect
//!                                         ▼
//!                                 ReconnectWaiting ──delay──▶ Connecting
//! ```
//!
//! # Reconnect policy
//!
//! Reconnection runs on a dedicated background task started by
//! [`ConnectionSupervisor::start`]. The reconnect delay elapses on
//! that task, never inside a caller: while the supervisor is waiting
//! out the delay, `execute` keeps failing fast with
//! [`SupervisorError::NotConnected`] instead of parking the caller
//! until the connection returns.
//!
//! A caller is suspended only for the duration of its own operation
//! round-trip (bounded by the transport's operation timeout), or for
//! operations already queued ahead of it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{SupervisorError, TransportError};
use crate::transport::{Transport, TransportOp};
use crate::types::ConnectionState;

/// Buffer for state-change notifications. Transitions are rare, so a
/// small buffer is enough for any subscriber that polls occasionally.
const STATE_CHANNEL_CAPACITY: usize = 32;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the connection supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Whether to reconnect automatically after a lost connection.
    pub auto_reconnect: bool,
    /// Fixed delay between reconnect attempts.
    pub reconnect_delay: Duration,
}

impl SupervisorConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to reconnect automatically.
    pub fn with_auto_reconnect(mut self, auto_reconnect: bool) -> Self {
        self.auto_reconnect = auto_reconnect;
        self
    }

    /// Sets the reconnect delay.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Snapshot of supervisor activity.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SupervisorStats {
    /// Connect attempts, including reconnects.
    pub connect_attempts: u64,
    /// Connect attempts that failed.
    pub connect_failures: u64,
    /// Operations handed to the transport.
    pub operations: u64,
    /// Operations that returned an error other than a lost connection.
    pub operation_failures: u64,
    /// Operations rejected without touching the transport.
    pub operations_rejected: u64,
    /// Times an established connection was lost.
    pub disconnections: u64,
}

/// Atomic counters behind [`SupervisorStats`].
#[derive(Debug, Default)]
struct StatsInner {
    connect_attempts: AtomicU64,
    connect_failures: AtomicU64,
    operations: AtomicU64,
    operation_failures: AtomicU64,
    operations_rejected: AtomicU64,
    disconnections: AtomicU64,
}

// =============================================================================
// Connection Supervisor
// =============================================================================

/// State shared between the supervisor handle and its reconnect task.
struct SupervisorShared {
    /// The supervised transport. The mutex is the serialization point
    /// for every wire operation.
    transport: Mutex<Box<dyn Transport>>,
    /// Current state, readable without blocking.
    state: RwLock<ConnectionState>,
    /// State-change notifications.
    state_tx: broadcast::Sender<ConnectionState>,
    /// Endpoint captured at construction, for logging.
    endpoint: String,
    /// Configuration.
    config: SupervisorConfig,
    /// Whether the supervisor should be holding a connection open.
    /// Set by `request_connect`, cleared by `request_disconnect`.
    reconnect_armed: AtomicBool,
    /// Wakes the reconnect task after a failure.
    wake: Notify,
    /// Statistics.
    stats: StatsInner,
}

/// Supervises one transport connection.
///
/// See the [module documentation](self) for the state machine and the
/// reconnect policy.
pub struct ConnectionSupervisor {
    shared: Arc<SupervisorShared>,
    /// Shutdown signal for the reconnect task.
    shutdown: Arc<Notify>,
    /// Whether the reconnect task is running.
    running: Arc<AtomicBool>,
}

impl ConnectionSupervisor {
    /// Creates a supervisor over the given transport.
    ///
    /// The transport starts disconnected; call [`start`](Self::start)
    /// and then [`request_connect`](Self::request_connect).
    pub fn new(transport: Box<dyn Transport>, config: SupervisorConfig) -> Self {
        let (state_tx, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);
        let endpoint = transport.endpoint();

        Self {
            shared: Arc::new(SupervisorShared {
                transport: Mutex::new(transport),
                state: RwLock::new(ConnectionState::Disconnected),
                state_tx,
                endpoint,
                config,
                reconnect_armed: AtomicBool::new(false),
                wake: Notify::new(),
                stats: StatsInner::default(),
            }),
            shutdown: Arc::new(Notify::new()),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the current connection state without blocking.
    pub fn current_state(&self) -> ConnectionState {
        *self.shared.state.read()
    }

    /// Subscribes to state changes.
    ///
    /// Every transition is broadcast once, after it took effect.
    pub fn subscribe_state(&self) -> broadcast::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Returns the endpoint of the supervised transport.
    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    /// Returns current statistics.
    pub fn stats(&self) -> SupervisorStats {
        let stats = &self.shared.stats;
        SupervisorStats {
            connect_attempts: stats.connect_attempts.load(Ordering::Relaxed),
            connect_failures: stats.connect_failures.load(Ordering::Relaxed),
            operations: stats.operations.load(Ordering::Relaxed),
            operation_failures: stats.operation_failures.load(Ordering::Relaxed),
            operations_rejected: stats.operations_rejected.load(Ordering::Relaxed),
            disconnections: stats.disconnections.load(Ordering::Relaxed),
        }
    }

    /// Returns `true` if the reconnect task is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Requests that the supervisor establish and hold a connection.
    ///
    /// One connect attempt is made inline; if it fails the error is
    /// returned, and the reconnect task keeps retrying in the
    /// background when auto-reconnect is enabled. Calling this while
    /// already connected (or while an attempt is in flight) is a
    /// no-op.
    pub async fn request_connect(&self) -> Result<(), SupervisorError> {
        self.shared.reconnect_armed.store(true, Ordering::SeqCst);

        if self.current_state() != ConnectionState::Disconnected {
            return Ok(());
        }

        match Self::try_connect(&self.shared).await {
            Ok(()) => Ok(()),
            Err(err) => {
                if self.shared.config.auto_reconnect {
                    self.shared.wake.notify_one();
                }
                Err(SupervisorError::Transport(err))
            }
        }
    }

    /// Requests that the supervisor drop the connection and stay down.
    ///
    /// Disarms auto-reconnect, closes the transport if it is open, and
    /// settles in `Disconnected`. Calling this while already
    /// disconnected is a no-op.
    pub async fn request_disconnect(&self) {
        self.shared.reconnect_armed.store(false, Ordering::SeqCst);

        let mut transport = self.shared.transport.lock().await;
        if transport.is_connected() {
            if let Err(err) = transport.disconnect().await {
                warn!(endpoint = %self.shared.endpoint, error = %err, "Disconnect failed");
            }
        }
        Self::set_state(&self.shared, ConnectionState::Disconnected);
    }

    /// Runs one transport operation through the supervisor.
    ///
    /// This is the only path to the transport. Operations from all
    /// callers are serialized; a caller waits at most for operations
    /// already in flight, each bounded by the transport's own
    /// operation timeout; it never waits for a reconnect delay.
    ///
    /// When the transport reports a lost connection, the supervisor
    /// transitions to `Disconnected`, schedules a reconnect if armed,
    /// and surfaces the failure to this caller only. Protocol errors
    /// and timeouts pass through without a state change.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let values = supervisor
    ///     .execute(|t| t.read(Region::HoldingRegister, 100, 2))
    ///     .await?;
    /// ```
    pub async fn execute<T, F>(&self, op: F) -> Result<T, SupervisorError>
    where
        F: for<'a> FnOnce(&'a mut dyn Transport) -> TransportOp<'a, T>,
    {
        // Fail fast before queueing on the transport mutex, so callers
        // are never parked behind a connect attempt or reconnect wait.
        if !self.current_state().is_connected() {
            self.shared
                .stats
                .operations_rejected
                .fetch_add(1, Ordering::Relaxed);
            return Err(SupervisorError::NotConnected);
        }

        let mut transport = self.shared.transport.lock().await;

        // The connection may have dropped while we waited for our turn.
        if !self.current_state().is_connected() {
            self.shared
                .stats
                .operations_rejected
                .fetch_add(1, Ordering::Relaxed);
            return Err(SupervisorError::NotConnected);
        }

        self.shared.stats.operations.fetch_add(1, Ordering::Relaxed);

        match op(transport.as_mut()).await {
            Ok(value) => Ok(value),
            Err(err) if err.is_connection_lost() => {
                self.shared
                    .stats
                    .disconnections
                    .fetch_add(1, Ordering::Relaxed);
                warn!(endpoint = %self.shared.endpoint, error = %err, "Connection lost");

                // Flip the state while still holding the transport
                // lock, so callers queued behind us bail out on their
                // re-check instead of hitting the dead connection.
                Self::set_state(&self.shared, ConnectionState::Disconnected);
                drop(transport);

                if self.reconnect_due() {
                    self.shared.wake.notify_one();
                }
                Err(SupervisorError::Transport(err))
            }
            Err(err) => {
                self.shared
                    .stats
                    .operation_failures
                    .fetch_add(1, Ordering::Relaxed);
                Err(SupervisorError::Transport(err))
            }
        }
    }

    /// Starts the reconnect task in the background.
    ///
    /// Returns a `JoinHandle` that can be used to wait for the task to
    /// finish after [`stop`](Self::stop).
    pub fn start(&self) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);

        let shared = self.shared.clone();
        let shutdown = self.shutdown.clone();
        let running = self.running.clone();

        tokio::spawn(async move {
            info!(
                endpoint = %shared.endpoint,
                auto_reconnect = shared.config.auto_reconnect,
                delay_ms = shared.config.reconnect_delay.as_millis() as u64,
                "Connection supervisor started"
            );

            'outer: loop {
                tokio::select! {
                    _ = shared.wake.notified() => {}
                    _ = shutdown.notified() => break,
                }

                while running.load(Ordering::SeqCst) && Self::reconnect_due_in(&shared) {
                    Self::set_state(&shared, ConnectionState::ReconnectWaiting);

                    tokio::select! {
                        _ = tokio::time::sleep(shared.config.reconnect_delay) => {}
                        _ = shutdown.notified() => break 'outer,
                    }

                    // Disconnect requests and successful connects from
                    // elsewhere cancel the pending attempt.
                    if !Self::reconnect_due_in(&shared) {
                        break;
                    }

                    if Self::try_connect(&shared).await.is_ok() {
                        break;
                    }
                }
            }

            running.store(false, Ordering::SeqCst);
            info!(endpoint = %shared.endpoint, "Connection supervisor stopped");
        })
    }

    /// Signals the reconnect task to stop.
    ///
    /// The task also drops out of a pending reconnect delay. The
    /// transport itself is left as-is; call
    /// [`request_disconnect`](Self::request_disconnect) first for a
    /// clean close.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    /// Whether a reconnect attempt should be scheduled.
    fn reconnect_due(&self) -> bool {
        Self::reconnect_due_in(&self.shared)
    }

    fn reconnect_due_in(shared: &SupervisorShared) -> bool {
        shared.config.auto_reconnect
            && shared.reconnect_armed.load(Ordering::SeqCst)
            && !shared.state.read().is_connected()
    }

    /// One connect attempt under the transport lock.
    ///
    /// Races between an explicit `request_connect` and the reconnect
    /// task resolve here: whoever takes the lock second finds the
    /// state already `Connected` and backs off.
    async fn try_connect(shared: &Arc<SupervisorShared>) -> Result<(), TransportError> {
        let mut transport = shared.transport.lock().await;

        if shared.state.read().is_connected() {
            return Ok(());
        }

        Self::set_state(shared, ConnectionState::Connecting);
        shared.stats.connect_attempts.fetch_add(1, Ordering::Relaxed);

        match transport.connect().await {
            Ok(()) => {
                Self::set_state(shared, ConnectionState::Connected);
                info!(endpoint = %shared.endpoint, "Transport connected");
                Ok(())
            }
            Err(err) => {
                shared.stats.connect_failures.fetch_add(1, Ordering::Relaxed);
                Self::set_state(shared, ConnectionState::Disconnected);
                warn!(endpoint = %shared.endpoint, error = %err, "Connect attempt failed");
                Err(err)
            }
        }
    }

    /// Applies a state transition and broadcasts it if it changed
    /// anything.
    fn set_state(shared: &SupervisorShared, next: ConnectionState) {
        let previous = {
            let mut state = shared.state.write();
            std::mem::replace(&mut *state, next)
        };

        if previous != next {
            info!(from = %previous, to = %next, "Connection state changed");
            let _ = shared.state_tx.send(next);
        }
    }
}

impl std::fmt::Debug for ConnectionSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("endpoint", &self.shared.endpoint)
            .field("state", &self.current_state())
            .field("running", &self.is_running())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
