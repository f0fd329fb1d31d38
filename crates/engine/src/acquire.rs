// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered acquisition
//!
//! Locks are taken one at a time in [`AcquisitionOrder`]. The first failure
//! stops the sweep and hands back exactly what was already held, so the
//! caller can release it.

use crate::cancel::CancelSignal;
use lockstep_adapters::{CoordinationError, LockSession, MutexHandle};
use lockstep_core::{AcquisitionOrder, ResourceKey};
use std::time::Duration;
use thiserror::Error;

/// Mutexes acquired so far, in acquisition order.
///
/// Always a prefix of the order it was built from. Only this module pushes;
/// release pops.
pub struct HeldLockStack<M> {
    held: Vec<M>,
}

impl<M: MutexHandle> HeldLockStack<M> {
    pub(crate) fn new() -> Self {
        Self { held: Vec::new() }
    }

    fn push(&mut self, mutex: M) {
        self.held.push(mutex);
    }

    pub(crate) fn pop(&mut self) -> Option<M> {
        self.held.pop()
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Keys currently held, in acquisition order
    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.held.iter().map(MutexHandle::key)
    }

    pub fn is_prefix_of(&self, order: &AcquisitionOrder) -> bool {
        order.has_prefix(self.keys())
    }
}

impl<M: MutexHandle> std::fmt::Debug for HeldLockStack<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

/// Why a single lock could not be acquired
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquireReason {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("cancelled")]
    Cancelled,
    #[error("{0}")]
    Service(CoordinationError),
}

impl From<CoordinationError> for AcquireReason {
    fn from(err: CoordinationError) -> Self {
        match err {
            CoordinationError::Timeout(after) => AcquireReason::Timeout(after),
            other => AcquireReason::Service(other),
        }
    }
}

/// Acquisition stopped at `failed_key`; `partially_held` still needs release.
pub struct AcquisitionFailure<M> {
    pub failed_key: ResourceKey,
    pub reason: AcquireReason,
    pub partially_held: HeldLockStack<M>,
}

impl<M: MutexHandle> std::fmt::Debug for AcquisitionFailure<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionFailure")
            .field("failed_key", &self.failed_key)
            .field("reason", &self.reason)
            .field("partially_held", &self.partially_held)
            .finish()
    }
}

/// Acquire every key in `order`, strictly sequentially.
///
/// Never attempts a key after the first failure. Cancellation is observed
/// while waiting on a lock and abandons that attempt.
pub async fn acquire_all<S: LockSession>(
    session: &S,
    order: &AcquisitionOrder,
    per_lock_timeout: Duration,
    cancel: &CancelSignal,
) -> Result<HeldLockStack<S::Mutex>, AcquisitionFailure<S::Mutex>> {
    let mut stack = HeldLockStack::new();

    for (position, key) in order.iter().enumerate() {
        let attempt = if cancel.is_cancelled() {
            Err(AcquireReason::Cancelled)
        } else {
            let mut mutex = session.new_mutex(key);
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(AcquireReason::Cancelled),
                result = mutex.lock(per_lock_timeout) => result.map_err(AcquireReason::from),
            };
            result.map(|()| mutex)
        };

        match attempt {
            Ok(mutex) => {
                tracing::info!(%key, position, total = order.len(), "acquired");
                stack.push(mutex);
                debug_assert!(stack.is_prefix_of(order));
            }
            Err(reason) => {
                tracing::warn!(%key, position, held = stack.len(), %reason, "acquisition stopped");
                return Err(AcquisitionFailure {
                    failed_key: key.clone(),
                    reason,
                    partially_held: stack,
                });
            }
        }
    }

    Ok(stack)
}

#[cfg(test)]
#[path = "acquire_tests.rs"]
mod tests;
