// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::coordination::{CoordinationAdapter, CoordinationError, LockSession, MutexHandle};
use async_trait::async_trait;
use lockstep_core::ResourceKey;
use std::time::Duration;
use tracing::Instrument;

/// Wrapper that adds tracing to any CoordinationAdapter
#[derive(Clone)]
pub struct TracedCoordinationAdapter<C> {
    inner: C,
}

impl<C> TracedCoordinationAdapter<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: CoordinationAdapter> CoordinationAdapter for TracedCoordinationAdapter<C> {
    type Session = TracedLockSession<C::Session>;

    async fn open_session(&self, ttl: Duration) -> Result<Self::Session, CoordinationError> {
        let span = tracing::info_span!("coordination.open_session", ttl = ?ttl);

        async {
            tracing::info!("opening session");

            let start = std::time::Instant::now();
            let result = self.inner.open_session(ttl).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(session) => tracing::info!(
                    session_id = session.id(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "session opened"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "open failed"
                ),
            }

            result.map(TracedLockSession::new)
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any LockSession
pub struct TracedLockSession<S> {
    inner: S,
}

impl<S> TracedLockSession<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: LockSession> LockSession for TracedLockSession<S> {
    type Mutex = TracedMutex<S::Mutex>;

    fn id(&self) -> &str {
        self.inner.id()
    }

    fn lease_ttl(&self) -> Duration {
        self.inner.lease_ttl()
    }

    fn new_mutex(&self, key: &ResourceKey) -> Self::Mutex {
        tracing::trace!(session_id = self.inner.id(), %key, "new mutex");
        TracedMutex {
            inner: self.inner.new_mutex(key),
            session_id: self.inner.id().to_string(),
        }
    }

    async fn close(self) -> Result<(), CoordinationError> {
        let span = tracing::info_span!("coordination.close", session_id = self.inner.id());

        async {
            let result = self.inner.close().await;
            // close() failing is tolerable: the lease expires on its own
            match &result {
                Ok(()) => tracing::info!("session closed"),
                Err(e) => tracing::warn!(error = %e, "close failed (lease will expire)"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any MutexHandle
pub struct TracedMutex<M> {
    inner: M,
    session_id: String,
}

#[async_trait]
impl<M: MutexHandle> MutexHandle for TracedMutex<M> {
    fn key(&self) -> &ResourceKey {
        self.inner.key()
    }

    async fn lock(&mut self, timeout: Duration) -> Result<(), CoordinationError> {
        let span = tracing::info_span!(
            "coordination.lock",
            key = %self.inner.key(),
            session_id = %self.session_id,
        );

        async {
            tracing::debug!(timeout = ?timeout, "waiting for lock");

            let start = std::time::Instant::now();
            let result = self.inner.lock(timeout).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "locked"),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "lock failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn unlock(&mut self, timeout: Duration) -> Result<(), CoordinationError> {
        let span = tracing::info_span!(
            "coordination.unlock",
            key = %self.inner.key(),
            session_id = %self.session_id,
        );

        async {
            let start = std::time::Instant::now();
            let result = self.inner.unlock(timeout).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "unlocked"),
                Err(e) => tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "unlock failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
