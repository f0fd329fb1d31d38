// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::cancel::cancel_pair;
use lockstep_adapters::{CoordinationAdapter, FakeCoordinationAdapter};
use yare::parameterized;

const TIMEOUT: Duration = Duration::from_secs(1);

fn order(list: &str) -> AcquisitionOrder {
    AcquisitionOrder::parse_list(list).unwrap()
}

fn held_names<M: MutexHandle>(stack: &HeldLockStack<M>) -> Vec<String> {
    stack.keys().map(ToString::to_string).collect()
}

#[tokio::test]
async fn acquires_every_key_in_order() {
    let fake = FakeCoordinationAdapter::new();
    let session = fake.open_session(Duration::from_secs(60)).await.unwrap();
    let order = order("c,a,b");

    let stack = acquire_all(&session, &order, TIMEOUT, &CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(held_names(&stack), vec!["a", "b", "c"]);
    assert_eq!(fake.lock_attempts(), vec!["a", "b", "c"]);
    assert!(stack.is_prefix_of(&order));
}

#[tokio::test]
async fn stops_at_first_failure_and_returns_prefix() {
    let fake = FakeCoordinationAdapter::new();
    fake.fail_lock("b", CoordinationError::Service("unavailable".into()));
    let session = fake.open_session(Duration::from_secs(60)).await.unwrap();
    let order = order("b,a,c");

    let failure = acquire_all(&session, &order, TIMEOUT, &CancelSignal::never())
        .await
        .unwrap_err();

    assert_eq!(failure.failed_key.as_str(), "b");
    assert_eq!(
        failure.reason,
        AcquireReason::Service(CoordinationError::Service("unavailable".into()))
    );
    assert_eq!(held_names(&failure.partially_held), vec!["a"]);
    assert!(failure.partially_held.is_prefix_of(&order));
    // "c" is never attempted
    assert_eq!(fake.lock_attempts(), vec!["a", "b"]);
}

#[tokio::test]
async fn failure_on_first_key_holds_nothing() {
    let fake = FakeCoordinationAdapter::new();
    fake.fail_lock("a", CoordinationError::SessionExpired("lease gone".into()));
    let session = fake.open_session(Duration::from_secs(60)).await.unwrap();

    let failure = acquire_all(&session, &order("a,b"), TIMEOUT, &CancelSignal::never())
        .await
        .unwrap_err();

    assert!(failure.partially_held.is_empty());
    assert_eq!(fake.lock_attempts(), vec!["a"]);
}

#[tokio::test]
async fn contended_key_times_out() {
    let fake = FakeCoordinationAdapter::new();
    fake.hold_externally("b");
    let session = fake.open_session(Duration::from_secs(60)).await.unwrap();

    let failure = acquire_all(
        &session,
        &order("a,b"),
        Duration::from_millis(20),
        &CancelSignal::never(),
    )
    .await
    .unwrap_err();

    assert_eq!(failure.failed_key.as_str(), "b");
    assert_eq!(failure.reason, AcquireReason::Timeout(Duration::from_millis(20)));
    assert_eq!(failure.partially_held.len(), 1);
}

#[tokio::test]
async fn cancel_while_waiting_abandons_attempt() {
    let fake = FakeCoordinationAdapter::new();
    fake.hold_externally("b");
    let session = fake.open_session(Duration::from_secs(60)).await.unwrap();
    let (handle, signal) = cancel_pair();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    });

    let failure = acquire_all(&session, &order("a,b,c"), Duration::from_secs(30), &signal)
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert_eq!(failure.failed_key.as_str(), "b");
    assert_eq!(failure.reason, AcquireReason::Cancelled);
    assert_eq!(held_names(&failure.partially_held), vec!["a"]);
    assert_eq!(fake.lock_attempts(), vec!["a", "b"]);
}

#[tokio::test]
async fn cancelled_before_start_attempts_nothing() {
    let fake = FakeCoordinationAdapter::new();
    let session = fake.open_session(Duration::from_secs(60)).await.unwrap();
    let (handle, signal) = cancel_pair();
    handle.cancel();

    let failure = acquire_all(&session, &order("a,b"), TIMEOUT, &signal)
        .await
        .unwrap_err();

    assert_eq!(failure.failed_key.as_str(), "a");
    assert_eq!(failure.reason, AcquireReason::Cancelled);
    assert!(fake.lock_attempts().is_empty());
}

#[test]
fn timeout_errors_map_to_timeout_reason() {
    let reason = AcquireReason::from(CoordinationError::Timeout(TIMEOUT));
    assert_eq!(reason, AcquireReason::Timeout(TIMEOUT));
    assert_eq!(reason.to_string(), "timed out after 1s");
}

#[parameterized(
    timeout = { CoordinationError::Timeout(TIMEOUT), AcquireReason::Timeout(TIMEOUT) },
    expired = {
        CoordinationError::SessionExpired("lease gone".into()),
        AcquireReason::Service(CoordinationError::SessionExpired("lease gone".into()))
    },
    service = {
        CoordinationError::Service("unavailable".into()),
        AcquireReason::Service(CoordinationError::Service("unavailable".into()))
    },
)]
fn service_errors_map_to_reasons(err: CoordinationError, expected: AcquireReason) {
    assert_eq!(AcquireReason::from(err), expected);
}

#[tokio::test]
async fn lock_timeout_reports_timeout_reason() {
    let fake = FakeCoordinationAdapter::new();
    fake.fail_lock("a", CoordinationError::Timeout(TIMEOUT));
    let session = fake.open_session(Duration::from_secs(60)).await.unwrap();

    let failure = acquire_all(&session, &order("a"), TIMEOUT, &CancelSignal::never())
        .await
        .unwrap_err();

    assert_eq!(failure.reason, AcquireReason::Timeout(TIMEOUT));
    assert!(failure.partially_held.is_empty());
}
