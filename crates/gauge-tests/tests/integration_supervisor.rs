// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Supervisor Integration Tests
//!
//! Integration tests for the connection supervisor over an in-memory
//! device: lifecycle transitions, fail-fast admission, automatic
//! reconnection pacing, and serialization of the shared connection.
//!
//! Reconnect timing runs under a paused tokio clock, so delays elapse
//! virtually and the tests stay fast.
//!
//! ## Test Categories
//!
//! - `test_lifecycle_*`: state transitions and idempotent requests
//! - `test_failfast_*`: admission control while disconnected
//! - `test_reconnect_*`: automatic reconnection behavior
//! - `test_serialization_*`: one operation at a time on the wire

use std::sync::Arc;
use std::time::Duration;

use gauge_core::{ConnectionState, Region, SupervisorError, WriteError, WritePayload, WriteValue};

use gauge_tests::prelude::*;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

fn paced_stack(tags: Vec<gauge_core::Tag>) -> TestStack {
    TestStack::with_config(
        tags,
        StackConfig::new().reconnect_delay(RECONNECT_DELAY),
    )
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_lifecycle_walks_through_connecting() {
    let stack = TestStack::demo().await;
    let mut recorder = StateRecorder::attach(&stack.supervisor);

    assert_eq!(stack.supervisor.current_state(), ConnectionState::Disconnected);
    stack.connect().await;

    let seen = recorder.wait_for(ConnectionState::Connected).await;
    assert_eq!(
        seen,
        vec![ConnectionState::Connecting, ConnectionState::Connected]
    );

    stack.teardown().await;
}

#[tokio::test]
async fn test_lifecycle_connect_and_disconnect_are_idempotent() {
    let stack = TestStack::demo().await;

    stack.connect().await;
    stack.connect().await;
    assert_eq!(stack.mock.connect_count(), 1);

    stack.supervisor.request_disconnect().await;
    stack.supervisor.request_disconnect().await;
    assert_eq!(stack.mock.disconnect_count(), 1);
    assert_eq!(stack.supervisor.current_state(), ConnectionState::Disconnected);

    stack.teardown().await;
}

#[tokio::test]
async fn test_lifecycle_endpoint_and_running_flag() {
    let stack = TestStack::demo().await;
    assert_eq!(stack.supervisor.endpoint(), "mock-plc:502#1");
    assert!(stack.supervisor.is_running());

    let supervisor = stack.supervisor.clone();
    stack.teardown().await;
    assert!(!supervisor.is_running());
}

// =============================================================================
// Fail-Fast Admission Tests
// =============================================================================

#[tokio::test]
async fn test_failfast_operations_never_touch_disconnected_transport() {
    let stack = TestStack::new(TagFixtures::demo_tags());

    let err = stack
        .gateway
        .write("temperature", WriteValue::Number(1.0))
        .await
        .assert_err();
    assert_eq!(err, WriteError::NotConnected);

    let summary = stack.poller.poll_once().await;
    assert_eq!(summary.failed, 3);

    assert_eq!(stack.mock.read_count(), 0);
    assert_eq!(stack.mock.write_count(), 0);

    // Two batch reads and one write were all rejected at admission.
    let stats = stack.supervisor.stats();
    assert_eq!(stats.operations_rejected, 3);
    assert_eq!(stats.operations, 0);

    stack.teardown().await;
}

#[tokio::test]
async fn test_failfast_lost_connection_surfaces_to_failing_caller_only() {
    let stack = TestStack::with_config(
        TagFixtures::demo_tags(),
        StackConfig::new().no_reconnect(),
    );
    DeviceFixtures::seed_demo(&stack.mock).await;
    stack.connect().await;

    // The coil batch read hits the dropped connection and reports it.
    stack.mock.drop_next_read();
    let summary = stack.poller.poll_once().await;
    assert_eq!(summary.failed, 3);
    assert_eq!(stack.supervisor.current_state(), ConnectionState::Disconnected);

    // Later callers get a plain NotConnected, not the transport error,
    // and nothing further reaches the device.
    let reads_so_far = stack.mock.read_count();
    let err = stack
        .gateway
        .write("temperature", WriteValue::Number(1.0))
        .await
        .assert_err();
    assert_eq!(err, WriteError::NotConnected);
    assert_eq!(stack.mock.read_count(), reads_so_far);
    assert_eq!(stack.mock.write_count(), 0);
    assert_eq!(stack.supervisor.stats().disconnections, 1);

    stack.teardown().await;
}

// =============================================================================
// Reconnect Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_reconnect_recovers_after_lost_connection() {
    let stack = paced_stack(TagFixtures::demo_tags());
    DeviceFixtures::seed_demo(&stack.mock).await;
    stack.connect().await;
    let mut recorder = StateRecorder::attach(&stack.supervisor);

    stack.mock.drop_next_read();
    stack.poller.poll_once().await;

    let seen = recorder.wait_for(ConnectionState::Connected).await;
    assert_eq!(
        seen,
        vec![
            ConnectionState::Disconnected,
            ConnectionState::ReconnectWaiting,
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ]
    );

    // The delay elapsed between the drop and the second attempt.
    let times = stack.mock.connect_times().await;
    assert_eq!(times.len(), 2);
    assert!(times[1] - times[0] >= RECONNECT_DELAY);

    // Polling resumes where it left off.
    let summary = stack.poller.poll_once().await;
    assert_eq!(summary.succeeded, 3);

    stack.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_attempts_are_paced_by_fixed_delay() {
    let stack = paced_stack(TagFixtures::demo_tags());
    stack.mock.set_fail_connection(true);

    assert!(stack.supervisor.request_connect().await.is_err());

    // Let a few background attempts fail.
    let mock = stack.mock.clone();
    wait_for_or_panic(
        Duration::from_secs(120),
        Duration::from_millis(50),
        "reconnect attempts did not accrue",
        move || {
            let mock = mock.clone();
            async move { mock.connect_count() >= 3 }
        },
    )
    .await;

    stack.mock.set_fail_connection(false);
    let mut recorder = StateRecorder::attach(&stack.supervisor);
    recorder.wait_for(ConnectionState::Connected).await;

    let times = stack.mock.connect_times().await;
    for pair in times.windows(2) {
        assert!(
            pair[1] - pair[0] >= RECONNECT_DELAY,
            "attempts spaced {:?}, expected at least {:?}",
            pair[1] - pair[0],
            RECONNECT_DELAY
        );
    }

    stack.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_wait_never_blocks_callers() {
    let stack = paced_stack(TagFixtures::demo_tags());
    DeviceFixtures::seed_demo(&stack.mock).await;
    stack.connect().await;
    let mut recorder = StateRecorder::attach(&stack.supervisor);

    stack.mock.drop_next_read();
    stack.poller.poll_once().await;
    recorder.wait_for(ConnectionState::ReconnectWaiting).await;

    // A write submitted mid-wait returns at once instead of parking
    // until the delay elapses.
    let before = tokio::time::Instant::now();
    let err = stack
        .gateway
        .write("temperature", WriteValue::Number(1.0))
        .await
        .assert_err();
    assert_eq!(err, WriteError::NotConnected);
    assert!(before.elapsed() < RECONNECT_DELAY);
    assert_eq!(stack.mock.write_count(), 0);

    // Once the delay elapses the connection returns and the same write
    // goes through.
    recorder.wait_for(ConnectionState::Connected).await;
    stack
        .gateway
        .write("temperature", WriteValue::Number(240.0))
        .await
        .assert_ok();

    stack.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_disarmed_by_explicit_disconnect() {
    let stack = paced_stack(TagFixtures::demo_tags());
    stack.connect().await;

    stack.supervisor.request_disconnect().await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(stack.supervisor.current_state(), ConnectionState::Disconnected);
    assert_eq!(stack.mock.connect_count(), 1);

    stack.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_retries_after_failed_initial_connect() {
    let stack = paced_stack(TagFixtures::demo_tags());
    stack.mock.fail_next_connect();

    let err = stack.supervisor.request_connect().await.unwrap_err();
    assert!(matches!(err, SupervisorError::Transport(_)));

    let mut recorder = StateRecorder::attach(&stack.supervisor);
    recorder.wait_for(ConnectionState::Connected).await;
    assert_eq!(stack.mock.connect_count(), 2);

    stack.teardown().await;
}

// =============================================================================
// Serialization Tests
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_serialization_one_operation_on_the_wire_at_a_time() {
    let stack = TestStack::new(TagFixtures::plant_tags());
    stack.mock.set_op_delay(Duration::from_millis(10)).await;
    stack.connect().await;

    let mut handles = Vec::new();
    for i in 0..8u16 {
        let supervisor = stack.supervisor.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                supervisor
                    .execute(|t| t.read(Region::HoldingRegister, 100, 2))
                    .await
                    .map(|_| ())
            } else {
                supervisor
                    .execute(move |t| {
                        t.write(Region::HoldingRegister, 300, WritePayload::Register(i))
                    })
                    .await
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap().assert_ok();
    }

    assert_eq!(stack.mock.max_in_flight(), 1);
    assert_eq!(stack.mock.read_count() + stack.mock.write_count(), 8);
    assert_eq!(stack.supervisor.stats().operations, 8);

    stack.teardown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_serialization_poller_and_gateway_share_the_connection() {
    let stack = TestStack::new(TagFixtures::plant_tags());
    DeviceFixtures::seed_demo(&stack.mock).await;
    stack.mock.set_op_delay(Duration::from_millis(5)).await;
    stack.connect().await;

    let gateway = Arc::new(gauge_core::WriteGateway::new(
        stack.registry.clone(),
        stack.supervisor.clone(),
    ));

    let poller = stack.poller.clone();
    let poll_task = tokio::spawn(async move {
        for _ in 0..3 {
            poller.poll_once().await;
        }
    });

    let write_task = tokio::spawn({
        let gateway = gateway.clone();
        async move {
            for i in 0..3u16 {
                gateway
                    .write("setpoint", WriteValue::Number(f64::from(i)))
                    .await
                    .assert_ok();
            }
        }
    });

    poll_task.await.unwrap();
    write_task.await.unwrap();

    assert_eq!(stack.mock.max_in_flight(), 1);
    assert_eq!(stack.mock.write_count(), 3);

    stack.teardown().await;
}
