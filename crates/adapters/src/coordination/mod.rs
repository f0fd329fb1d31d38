// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination service adapters
//!
//! The coordinator only needs three capabilities from the external lock
//! service: open a lease-bound session, create a mutex for a key inside that
//! session, and lock/unlock that mutex with a deadline.

#[cfg(feature = "etcd")]
mod etcd;
mod lease_table;

#[cfg(feature = "etcd")]
pub use etcd::{EtcdAdapter, EtcdMutex, EtcdSession};
pub use lease_table::{LeaseTableAdapter, LeaseTableMutex, LeaseTableSession};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{CoordinationCall, FakeCoordinationAdapter, FakeMutex, FakeSession};

use async_trait::async_trait;
use lockstep_core::ResourceKey;
use std::time::Duration;
use thiserror::Error;

/// Errors from the coordination service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinationError {
    #[error("cannot connect to {endpoints}: {message}")]
    Connect { endpoints: String, message: String },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("session expired: {0}")]
    SessionExpired(String),
    #[error("lock not held: {0}")]
    NotHeld(String),
    #[error("service error: {0}")]
    Service(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Entry point to a coordination service
#[async_trait]
pub trait CoordinationAdapter: Clone + Send + Sync + 'static {
    type Session: LockSession;

    /// Open a session whose lease lives for `ttl` unless renewed by the service
    async fn open_session(&self, ttl: Duration) -> Result<Self::Session, CoordinationError>;
}

/// A live, lease-bound binding to the coordination service.
///
/// Owned by exactly one job run. Every mutex created from a session is
/// scoped to its lease.
#[async_trait]
pub trait LockSession: Send + Sync + Sized + 'static {
    type Mutex: MutexHandle;

    /// Identifier of the session (the lease id for etcd)
    fn id(&self) -> &str;

    /// Lease TTL the session was opened with
    fn lease_ttl(&self) -> Duration;

    /// Create a mutex handle for `key` bound to this session
    fn new_mutex(&self, key: &ResourceKey) -> Self::Mutex;

    /// Release the session's lease
    async fn close(self) -> Result<(), CoordinationError>;
}

/// A mutex for one key inside one session
#[async_trait]
pub trait MutexHandle: Send + Sync + 'static {
    fn key(&self) -> &ResourceKey;

    /// Block until the lock is acquired or `timeout` elapses
    async fn lock(&mut self, timeout: Duration) -> Result<(), CoordinationError>;

    /// Release the lock, giving up after `timeout`
    async fn unlock(&mut self, timeout: Duration) -> Result<(), CoordinationError>;
}
