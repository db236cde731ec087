// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Periodic register poller.
//!
//! The poller reads every polled tag once per cycle at a fixed period,
//! batching contiguous addresses into single transport reads. Each
//! cycle publishes one [`PolledValue`] per tag on the data bus and
//! updates the latest-value map, whether the read succeeded or not:
//!
//! - on success the fresh value is published with `valid = true`;
//! - on failure the previous value is republished with `valid = false`
//!   and a fresh timestamp, so consumers keep the last known good
//!   reading instead of a blank.
//!
//! Cycles never overlap. A cycle runs to completion before the next
//! tick is honored, and ticks that pass while a cycle is still running
//! are skipped rather than replayed in a burst.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::bus::{DataBus, DataSubscriber};
use crate::error::SupervisorError;
use crate::registry::TagRegistry;
use crate::supervisor::ConnectionSupervisor;
use crate::types::{PolledValue, RawValue, Region, RegisterValues, ScaledValue, Tag};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the register poller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Fixed period between poll cycles.
    pub poll_interval: Duration,
    /// Capacity of the data bus fed by this poller.
    pub bus_capacity: usize,
}

impl PollerConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the data bus capacity.
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            bus_capacity: 1024,
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Snapshot of poller activity.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PollerStats {
    /// Completed poll cycles.
    pub cycles: u64,
    /// Batch reads handed to the supervisor.
    pub reads: u64,
    /// Batch reads that failed.
    pub read_failures: u64,
    /// Values published with `valid = true`.
    pub values_published: u64,
    /// Values republished with `valid = false`.
    pub values_invalidated: u64,
}

/// Atomic counters behind [`PollerStats`].
#[derive(Debug, Default)]
struct StatsInner {
    cycles: AtomicU64,
    reads: AtomicU64,
    read_failures: AtomicU64,
    values_published: AtomicU64,
    values_invalidated: AtomicU64,
}

/// Outcome of a single poll cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    /// Tags refreshed with a valid value.
    pub succeeded: usize,
    /// Tags republished as invalid.
    pub failed: usize,
}

// =============================================================================
// Poll batches
// =============================================================================

/// One contiguous read covering one or more tags.
#[derive(Debug, Clone)]
struct PollBatch {
    region: Region,
    start: u16,
    count: u16,
    tags: Vec<Arc<Tag>>,
}

/// Groups the registry's polled tags into contiguous batches.
///
/// Tags arrive sorted by (region, address). A tag joins the previous
/// batch when it continues the address run exactly and the batch stays
/// within the region's per-read limit; any gap starts a new batch, so
/// a read never touches addresses no tag asked for.
fn build_batches(registry: &TagRegistry) -> Vec<PollBatch> {
    let mut batches: Vec<PollBatch> = Vec::new();

    for tag in registry.all_polled_tags() {
        match batches.last_mut() {
            Some(batch)
                if batch.region == tag.region
                    && u32::from(batch.start) + u32::from(batch.count) == u32::from(tag.address)
                    && u32::from(batch.count) + u32::from(tag.length)
                        <= u32::from(batch.region.max_read_count()) =>
            {
                batch.count += tag.length;
                batch.tags.push(tag.clone());
            }
            _ => batches.push(PollBatch {
                region: tag.region,
                start: tag.address,
                count: tag.length,
                tags: vec![tag.clone()],
            }),
        }
    }

    batches
}

// =============================================================================
// Register Poller
// =============================================================================

/// State shared between the poller handle and its poll task.
struct PollerShared {
    supervisor: Arc<ConnectionSupervisor>,
    batches: Vec<PollBatch>,
    latest: DashMap<String, PolledValue>,
    bus: DataBus,
    poll_interval: Duration,
    stats: StatsInner,
}

/// Polls the registry's tags at a fixed period.
pub struct RegisterPoller {
    shared: Arc<PollerShared>,
    /// Shutdown signal for the poll task.
    shutdown: Arc<Notify>,
    /// Whether the poll task is running.
    running: Arc<AtomicBool>,
}

impl RegisterPoller {
    /// Creates a poller over the given registry and supervisor.
    ///
    /// Every polled tag is seeded into the latest-value map with a
    /// zero value and `valid = false`, so `latest` answers before the
    /// first cycle completes.
    pub fn new(
        registry: Arc<TagRegistry>,
        supervisor: Arc<ConnectionSupervisor>,
        config: PollerConfig,
    ) -> Self {
        let batches = build_batches(&registry);
        let latest = DashMap::with_capacity(registry.all_polled_tags().len());

        let seeded_at = Utc::now();
        for tag in registry.all_polled_tags() {
            latest.insert(tag.name.clone(), PolledValue::initial(tag.clone(), seeded_at));
        }

        Self {
            shared: Arc::new(PollerShared {
                supervisor,
                batches,
                latest,
                bus: DataBus::new(config.bus_capacity),
                poll_interval: config.poll_interval,
                stats: StatsInner::default(),
            }),
            shutdown: Arc::new(Notify::new()),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the latest record for a tag, valid or not.
    pub fn latest(&self, tag_name: &str) -> Option<PolledValue> {
        self.shared
            .latest
            .get(tag_name)
            .map(|entry| entry.value().clone())
    }

    /// Returns the latest record for every polled tag, sorted by
    /// (region, address) for stable display.
    pub fn snapshot(&self) -> Vec<PolledValue> {
        let mut values: Vec<PolledValue> = self
            .shared
            .latest
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        values.sort_by_key(|v| (v.tag.region, v.tag.address));
        values
    }

    /// Subscribes to the stream of published values.
    pub fn subscribe(&self) -> DataSubscriber {
        self.shared.bus.subscribe()
    }

    /// Returns current statistics.
    pub fn stats(&self) -> PollerStats {
        let stats = &self.shared.stats;
        PollerStats {
            cycles: stats.cycles.load(Ordering::Relaxed),
            reads: stats.reads.load(Ordering::Relaxed),
            read_failures: stats.read_failures.load(Ordering::Relaxed),
            values_published: stats.values_published.load(Ordering::Relaxed),
            values_invalidated: stats.values_invalidated.load(Ordering::Relaxed),
        }
    }

    /// Returns `true` if the poll task is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs one poll cycle immediately, outside the periodic schedule.
    pub async fn poll_once(&self) -> PollSummary {
        Self::poll_cycle(&self.shared).await
    }

    /// Starts the poll loop in the background.
    ///
    /// Returns a `JoinHandle` that can be used to wait for the loop to
    /// finish after [`stop`](Self::stop).
    pub fn start(&self) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);

        let shared = self.shared.clone();
        let shutdown = self.shutdown.clone();
        let running = self.running.clone();

        tokio::spawn(async move {
            info!(
                interval_ms = shared.poll_interval.as_millis() as u64,
                batches = shared.batches.len(),
                tags = shared.latest.len(),
                "Register poll loop started"
            );

            let mut interval = tokio::time::interval(shared.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if !running.load(Ordering::SeqCst) {
                            break;
                        }

                        Self::poll_cycle(&shared).await;
                    }
                    _ = shutdown.notified() => {
                        info!("Register poll loop shutting down");
                        break;
                    }
                }
            }

            running.store(false, Ordering::SeqCst);
            info!("Register poll loop stopped");
        })
    }

    /// Signals the poll loop to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    /// One full pass over all batches.
    ///
    /// Runs inline in the poll loop's tick arm, which is what makes
    /// overlapping cycles impossible.
    async fn poll_cycle(shared: &Arc<PollerShared>) -> PollSummary {
        let mut summary = PollSummary::default();

        for batch in &shared.batches {
            let (region, start, count) = (batch.region, batch.start, batch.count);
            shared.stats.reads.fetch_add(1, Ordering::Relaxed);

            let result = shared
                .supervisor
                .execute(move |t| t.read(region, start, count))
                .await;
            let timestamp = Utc::now();

            match result {
                Ok(values) => {
                    Self::store_batch(shared, batch, &values, timestamp, &mut summary);
                }
                Err(err) => {
                    shared.stats.read_failures.fetch_add(1, Ordering::Relaxed);
                    // Polling while disconnected is the idle state, not
                    // an incident; only unexpected failures warrant a
                    // warning.
                    if matches!(err, SupervisorError::NotConnected) {
                        debug!(region = %region, start, count, "Poll batch skipped, not connected");
                    } else {
                        warn!(region = %region, start, count, error = %err, "Poll batch failed");
                    }
                    for tag in &batch.tags {
                        Self::invalidate_tag(shared, tag, timestamp, &mut summary);
                    }
                }
            }
        }

        shared.stats.cycles.fetch_add(1, Ordering::Relaxed);
        summary
    }

    /// Decodes and publishes every tag of a successfully read batch.
    fn store_batch(
        shared: &PollerShared,
        batch: &PollBatch,
        values: &RegisterValues,
        timestamp: DateTime<Utc>,
        summary: &mut PollSummary,
    ) {
        for tag in &batch.tags {
            let offset = usize::from(tag.address - batch.start);
            match decode_tag(tag, values, offset) {
                Some((raw, scaled)) => {
                    let record = PolledValue {
                        tag: tag.clone(),
                        raw,
                        scaled,
                        timestamp,
                        valid: true,
                    };
                    shared.latest.insert(tag.name.clone(), record.clone());
                    shared.bus.publish(record);
                    shared.stats.values_published.fetch_add(1, Ordering::Relaxed);
                    summary.succeeded += 1;
                }
                None => {
                    // A malformed or truncated response spoils only the
                    // tags it fails to cover.
                    warn!(tag = %tag.name, "Poll response did not cover tag");
                    Self::invalidate_tag(shared, tag, timestamp, summary);
                }
            }
        }
    }

    /// Republishes a tag's previous value as invalid.
    fn invalidate_tag(
        shared: &PollerShared,
        tag: &Arc<Tag>,
        timestamp: DateTime<Utc>,
        summary: &mut PollSummary,
    ) {
        let previous = shared
            .latest
            .get(&tag.name)
            .map(|entry| entry.value().clone());
        let record = match previous {
            Some(previous) => previous.invalidated(timestamp),
            None => PolledValue::initial(tag.clone(), timestamp),
        };

        shared.latest.insert(tag.name.clone(), record.clone());
        shared.bus.publish(record);
        shared
            .stats
            .values_invalidated
            .fetch_add(1, Ordering::Relaxed);
        summary.failed += 1;
    }
}

impl std::fmt::Debug for RegisterPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterPoller")
            .field("batches", &self.shared.batches.len())
            .field("tags", &self.shared.latest.len())
            .field("interval", &self.shared.poll_interval)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Extracts one tag's raw and scaled values from a batch response.
///
/// Returns `None` when the response shape does not match the region or
/// does not reach the tag's addresses.
fn decode_tag(
    tag: &Tag,
    values: &RegisterValues,
    offset: usize,
) -> Option<(RawValue, ScaledValue)> {
    match values {
        RegisterValues::Bits(bits) if tag.region.is_bit() => {
            let bit = *bits.get(offset)?;
            Some((RawValue::Bool(bit), ScaledValue::Bool(bit)))
        }
        RegisterValues::Words(words) if !tag.region.is_bit() => {
            let slice = words.get(offset..offset + usize::from(tag.length))?;
            let scaled = ScaledValue::Number(f64::from(slice[0]) * tag.scale);
            let raw = if tag.length > 1 {
                RawValue::Words(slice.to_vec())
            } else {
                RawValue::Word(slice[0])
            };
            Some((raw, scaled))
        }
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
