// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Graceful shutdown coordination.
//!
//! This module provides utilities for coordinating graceful shutdown
//! across the runtime's background tasks. It handles OS signals
//! (SIGTERM, SIGINT, SIGQUIT on Unix; Ctrl+C on Windows) and allows
//! tasks to subscribe to shutdown notifications.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

// =============================================================================
// ShutdownCoordinator
// =============================================================================

/// Coordinates graceful shutdown across multiple tasks.
///
/// The coordinator provides:
/// - A broadcast channel for notifying all subscribers of shutdown
/// - Signal handling for SIGTERM/SIGINT/SIGQUIT (Unix) or Ctrl+C (Windows)
///
/// # Example
///
/// ```ignore
/// use gauge_bin::shutdown::ShutdownCoordinator;
///
/// let coordinator = ShutdownCoordinator::new();
/// let mut rx = coordinator.subscribe();
///
/// tokio::spawn(async move {
///     rx.recv().await.ok();
///     println!("Shutdown received!");
/// });
///
/// coordinator.wait_for_shutdown().await;
/// ```
#[derive(Clone)]
pub struct ShutdownCoordinator {
    sender: broadcast::Sender<()>,
    shutdown_initiated: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    /// Creates a new shutdown coordinator.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribes to shutdown notifications.
    ///
    /// Returns a receiver that will receive a message when shutdown is
    /// initiated.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Initiates shutdown.
    ///
    /// This notifies all subscribers that shutdown has been initiated.
    /// Idempotent.
    pub fn initiate_shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("Shutdown initiated");
            let _ = self.sender.send(());
        }
    }

    /// Returns true if shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Waits for a shutdown signal (OS signal or manual initiation).
    ///
    /// This method sets up signal handlers and blocks until a shutdown
    /// signal is received.
    pub async fn wait_for_shutdown(&self) {
        let shutdown_initiated = self.shutdown_initiated.clone();
        let sender = self.sender.clone();

        // Already shutdown?
        if shutdown_initiated.load(Ordering::SeqCst) {
            return;
        }

        // Wait for OS signal
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm =
                signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
            let mut sigint =
                signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");
            let mut sigquit = signal(SignalKind::quit()).expect("Failed to register SIGQUIT handler");

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT");
                }
                _ = sigquit.recv() => {
                    info!("Received SIGQUIT");
                }
            }
        }

        #[cfg(windows)]
        {
            use tokio::signal::ctrl_c;

            ctrl_c().await.expect("Failed to register Ctrl+C handler");
            info!("Received Ctrl+C");
        }

        // Mark as shutdown and notify subscribers
        if shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let _ = sender.send(());
        }
    }
}

impl Default for ShutdownCoordinator {
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

    #[tokio::test]
    async fn test_shutdown_coordinator() {
        let coordinator = ShutdownCoordinator::new();
        let mut rx = coordinator.subscribe();

        assert!(!coordinator.is_shutdown_initiated());

        coordinator.initiate_shutdown();

        assert!(coordinator.is_shutdown_initiated());
        assert!(rx.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let coordinator = ShutdownCoordinator::new();
        let mut rx1 = coordinator.subscribe();
        let mut rx2 = coordinator.subscribe();

        coordinator.initiate_shutdown();

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_double_shutdown() {
        let coordinator = ShutdownCoordinator::new();

        coordinator.initiate_shutdown();
        coordinator.initiate_shutdown(); // Should be idempotent

        assert!(coordinator.is_shutdown_initiated());
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_after_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.initiate_shutdown();

        // Must not block on signal handlers once shutdown is already set.
        coordinator.wait_for_shutdown().await;
    }
}
