// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Broadcast bus for distributing polled values.
//!
//! The poller publishes every [`PolledValue`] it produces onto a
//! [`DataBus`]; any number of consumers (display widgets, loggers,
//! recorders) subscribe independently and receive all records.
//!
//! # Design Principles
//!
//! - `tokio::sync::broadcast` for efficient 1:N fan-out
//! - A slow subscriber loses its own oldest messages but never stalls
//!   the poller or other subscribers
//! - Statistics are lock-free atomics, readable at any time
//!
//! # Example
//!
//! ```rust,ignore
//! use gauge_core::bus::DataBus;
//!
//! let bus = DataBus::new(1024);
//! let mut subscriber = bus.subscribe();
//!
//! bus.publish(value);
//! let received = subscriber.recv().await;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::PolledValue;

// =============================================================================
// Bus Statistics
// =============================================================================

/// Snapshot of bus activity.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BusStats {
    /// Total values published.
    pub values_published: u64,
    /// Values dropped because a subscriber lagged.
    pub values_dropped: u64,
    /// Current number of subscribers.
    pub subscriber_count: u64,
}

/// Atomic statistics for lock-free updates.
#[derive(Debug, Default)]
struct AtomicBusStats {
    values_published: AtomicU64,
    values_dropped: AtomicU64,
}

// =============================================================================
// Data Bus
// =============================================================================

/// A broadcast bus carrying polled values to all subscribers.
pub struct DataBus {
    sender: broadcast::Sender<PolledValue>,
    capacity: usize,
    stats: Arc<AtomicBusStats>,
}

impl DataBus {
    /// Creates a new data bus with the specified capacity.
    ///
    /// The capacity bounds how far a subscriber may fall behind before
    /// it starts losing its oldest messages. A few poll cycles' worth
    /// of tags is plenty; 1024 covers 100 tags for ten cycles.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);

        Self {
            sender,
            capacity,
            stats: Arc::new(AtomicBusStats::default()),
        }
    }

    /// Publishes a value to all subscribers.
    ///
    /// Returns the number of subscribers that will receive it. Zero
    /// subscribers is not an error; the value is simply dropped.
    pub fn publish(&self, value: PolledValue) -> usize {
        let count = self.sender.send(value).unwrap_or(0);
        self.stats.values_published.fetch_add(1, Ordering::Relaxed);
        count
    }

    /// Creates a new subscriber.
    ///
    /// The subscriber sees only values published after this call.
    pub fn subscribe(&self) -> DataSubscriber {
        DataSubscriber {
            receiver: self.sender.subscribe(),
            stats: self.stats.clone(),
        }
    }

    /// Returns the current number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Returns the channel capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns current statistics.
    pub fn stats(&self) -> BusStats {
        BusStats {
            values_published: self.stats.values_published.load(Ordering::Relaxed),
            values_dropped: self.stats.values_dropped.load(Ordering::Relaxed),
            subscriber_count: self.subscriber_count() as u64,
        }
    }
}

impl std::fmt::Debug for DataBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataBus")
            .field("capacity", &self.capacity)
            .field("subscriber_count", &self.subscriber_count())
            .field(
                "values_published",
                &self.stats.values_published.load(Ordering::Relaxed),
            )
            .finish()
    }
}

// =============================================================================
// Data Subscriber
// =============================================================================

/// A subscriber to the data bus.
pub struct DataSubscriber {
    receiver: broadcast::Receiver<PolledValue>,
    stats: Arc<AtomicBusStats>,
}

impl DataSubscriber {
    /// Receives the next value.
    ///
    /// Lag is absorbed here: if this subscriber fell behind and lost
    /// messages, the loss is counted and reception continues with the
    /// oldest retained value. Returns `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<PolledValue> {
        loop {
            match self.receiver.recv().await {
                Ok(value) => return Some(value),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    self.stats.values_dropped.fetch_add(count, Ordering::Relaxed);
                    tracing::warn!(count, "data bus subscriber lagged, values dropped");
                }
            }
        }
    }

    /// Tries to receive a value without blocking.
    ///
    /// Returns `None` when no value is ready (empty, lagged, or closed).
    pub fn try_recv(&mut self) -> Option<PolledValue> {
        match self.receiver.try_recv() {
            Ok(value) => Some(value),
            Err(broadcast::error::TryRecvError::Lagged(count)) => {
                self.stats.values_dropped.fetch_add(count, Ordering::Relaxed);
                None
            }
            Err(_) => None,
        }
    }

    /// Narrows this subscriber to a single tag.
    pub fn filter_tag(self, tag_name: impl Into<String>) -> TagFilteredSubscriber {
        TagFilteredSubscriber {
            subscriber: self,
            tag_name: tag_name.into(),
        }
    }
}

/// A subscriber that only yields values for one tag.
pub struct TagFilteredSubscriber {
    subscriber: DataSubscriber,
    tag_name: String,
}

impl TagFilteredSubscriber {
    /// Receives the next value for the filtered tag.
    pub async fn recv(&mut self) -> Option<PolledValue> {
        loop {
            let value = self.subscriber.recv().await?;
            if value.tag.name == self.tag_name {
                return Some(value);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
