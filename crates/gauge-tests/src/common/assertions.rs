// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Custom Test Assertions
//!
//! Domain-specific assertion helpers for Gauge integration tests.
//!
//! ## Design Principles
//!
//! - Provide clear, informative failure messages
//! - Support both synchronous and asynchronous assertions

use std::time::Duration;

use gauge_core::{PolledValue, RawValue, ScaledValue};

// =============================================================================
// PolledValue Assertions
// =============================================================================

/// Assertion extensions for [`PolledValue`].
pub trait PolledValueAssertions {
    /// Assert that the record is valid (the last poll attempt succeeded).
    fn assert_valid(&self);

    /// Assert that the record is invalid (the last poll attempt failed).
    fn assert_invalid(&self);

    /// Assert the scaled value is a number within a tolerance.
    fn assert_number_approx(&self, expected: f64, tolerance: f64);

    /// Assert the scaled value is a specific boolean.
    fn assert_bool(&self, expected: bool);

    /// Assert the raw value is a specific single word.
    fn assert_raw_word(&self, expected: u16);

    /// Assert the record belongs to a specific tag.
    fn assert_tag(&self, name: &str);
}

impl PolledValueAssertions for PolledValue {
    fn assert_valid(&self) {
        assert!(
            self.valid,
            "Expected a valid record for '{}', but it is marked invalid (raw: {:?})",
            self.tag.name, self.raw
        );
    }

    fn assert_invalid(&self) {
        assert!(
            !self.valid,
            "Expected an invalid record for '{}', but it is marked valid (raw: {:?})",
            self.tag.name, self.raw
        );
    }

    fn assert_number_approx(&self, expected: f64, tolerance: f64) {
        let actual = match self.scaled {
            ScaledValue::Number(n) => n,
            ScaledValue::Bool(b) => panic!(
                "Expected a numeric value for '{}', but got Bool({})",
                self.tag.name, b
            ),
        };
        let diff = (actual - expected).abs();
        assert!(
            diff <= tolerance,
            "Expected {} ± {} for '{}', but got {} (diff: {})",
            expected,
            tolerance,
            self.tag.name,
            actual,
            diff
        );
    }

    fn assert_bool(&self, expected: bool) {
        assert_eq!(
            self.scaled.as_bool(),
            Some(expected),
            "Expected Bool({}) for '{}', but got {:?}",
            expected,
            self.tag.name,
            self.scaled
        );
    }

    fn assert_raw_word(&self, expected: u16) {
        assert_eq!(
            self.raw,
            RawValue::Word(expected),
            "Expected raw word {} for '{}', but got {:?}",
            expected,
            self.tag.name,
            self.raw
        );
    }

    fn assert_tag(&self, name: &str) {
        assert_eq!(
            self.tag.name, name,
            "Expected a record for tag '{}', but got one for '{}'",
            name, self.tag.name
        );
    }
}

// =============================================================================
// Snapshot Assertions
// =============================================================================

/// Assertion extensions for slices of [`PolledValue`] records, as
/// returned by the poller's snapshot.
pub trait SnapshotAssertions {
    /// Assert the number of records.
    fn assert_count(&self, expected: usize);

    /// Assert that every record is valid.
    fn assert_all_valid(&self);

    /// Assert that every record is invalid.
    fn assert_all_invalid(&self);

    /// Assert records are ordered by (region, address).
    fn assert_ordered_by_address(&self);

    /// Find the record for a tag, panicking with a clear message if it
    /// is missing.
    fn find_tag(&self, name: &str) -> &PolledValue;
}

impl SnapshotAssertions for [PolledValue] {
    fn assert_count(&self, expected: usize) {
        assert_eq!(
            self.len(),
            expected,
            "Expected {} records, but got {}",
            expected,
            self.len()
        );
    }

    fn assert_all_valid(&self) {
        for value in self {
            value.assert_valid();
        }
    }

    fn assert_all_invalid(&self) {
        for value in self {
            value.assert_invalid();
        }
    }

    fn assert_ordered_by_address(&self) {
        for i in 1..self.len() {
            let (a, b) = (&self[i - 1].tag, &self[i].tag);
            assert!(
                (a.region, a.address) <= (b.region, b.address),
                "Records are not ordered by address at index {}: {} before {}",
                i,
                a,
                b
            );
        }
    }

    fn find_tag(&self, name: &str) -> &PolledValue {
        self.iter()
            .find(|v| v.tag.name == name)
            .unwrap_or_else(|| panic!("No record for tag '{}' in snapshot", name))
    }
}

// =============================================================================
// Result Assertions
// =============================================================================

/// Assertion helper for Results.
pub trait ResultAssertions<T, E> {
    /// Assert that the result is Ok and return the value.
    fn assert_ok(self) -> T;

    /// Assert that the result is Err.
    fn assert_err(self) -> E;
}

impl<T: std::fmt::Debug, E: std::fmt::Debug> ResultAssertions<T, E> for Result<T, E> {
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, but got Err: {:?}", e),
        }
    }

    fn assert_err(self) -> E {
        match self {
            Ok(v) => panic!("Expected Err, but got Ok: {:?}", v),
            Err(e) => e,
        }
    }
}

// =============================================================================
// Async Assertion Helpers
// =============================================================================

/// Wait for a condition to become true within a timeout.
pub async fn wait_for<F, Fut>(timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = tokio::time::Instant::now();
    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

/// Wait for a condition to become true, panicking if it doesn't.
pub async fn wait_for_or_panic<F, Fut>(
    timeout: Duration,
    interval: Duration,
    message: &str,
    condition: F,
) where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    if !wait_for(timeout, interval, condition).await {
        panic!("Condition not met within {:?}: {}", timeout, message);
    }
}

// =============================================================================
// Macro Assertions
// =============================================================================

/// Assert that an async operation completes within a timeout.
#[macro_export]
macro_rules! assert_completes_within {
    ($timeout:expr, $future:expr) => {{
        match tokio::time::timeout($timeout, $future).await {
            Ok(result) => result,
            Err(_) => panic!("Operation did not complete within {:?}", $timeout),
        }
    }};
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::TagFixtures;
    use std::sync::Arc;

    fn record(valid: bool) -> PolledValue {
        let mut value = PolledValue::initial(Arc::new(TagFixtures::temperature()), chrono::Utc::now());
        value.valid = valid;
        value
    }

    #[test]
    fn test_valid_assertions() {
        record(true).assert_valid();
        record(false).assert_invalid();
    }

    #[test]
    #[should_panic(expected = "marked invalid")]
    fn test_assert_valid_panics_on_invalid() {
        record(false).assert_valid();
    }

    #[test]
    fn test_find_tag_locates_record() {
        let snapshot = vec![record(true)];
        snapshot.find_tag("temperature").assert_tag("temperature");
    }

    #[tokio::test]
    async fn test_wait_for_observes_condition() {
        assert!(wait_for(Duration::from_secs(1), Duration::from_millis(1), || async { true }).await);
        assert!(
            !wait_for(Duration::from_millis(20), Duration::from_millis(1), || async { false })
                .await
        );
    }
}
