// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reverse-order release
//!
//! Every held lock gets exactly one release attempt, newest first. Failures
//! are collected; they never stop the sweep and are not retried.

use crate::acquire::HeldLockStack;
use lockstep_adapters::{CoordinationError, MutexHandle};
use lockstep_core::ReleaseReport;
use std::time::Duration;

/// Release everything in `stack`, last acquired first.
///
/// Not cancellable: each attempt is bounded by `per_lock_timeout` instead.
pub async fn release_all<M: MutexHandle>(
    mut stack: HeldLockStack<M>,
    per_lock_timeout: Duration,
) -> ReleaseReport {
    let mut report = ReleaseReport::new();

    while let Some(mut mutex) = stack.pop() {
        let key = mutex.key().clone();
        let result = tokio::time::timeout(per_lock_timeout, mutex.unlock(per_lock_timeout))
            .await
            .unwrap_or(Err(CoordinationError::Timeout(per_lock_timeout)));

        match result {
            Ok(()) => {
                tracing::info!(%key, remaining = stack.len(), "released");
                report.record_released(key);
            }
            Err(e) => {
                tracing::warn!(%key, remaining = stack.len(), error = %e, "release failed");
                report.record_error(key, e.to_string());
            }
        }
    }

    report
}

#[cfg(test)]
#[path = "release_tests.rs"]
mod tests;
