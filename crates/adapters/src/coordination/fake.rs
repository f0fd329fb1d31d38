// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake coordination service for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{CoordinationAdapter, CoordinationError, LockSession, MutexHandle};
use async_trait::async_trait;
use lockstep_core::ResourceKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Holder name used for locks taken with [`FakeCoordinationAdapter::hold_externally`]
pub const EXTERNAL_HOLDER: &str = "external";

/// Recorded coordination call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinationCall {
    OpenSession { ttl: Duration },
    Lock { session: String, key: String },
    Unlock { session: String, key: String },
    CloseSession { session: String },
}

#[derive(Default)]
struct FakeState {
    holders: HashMap<ResourceKey, String>,
    lock_failures: HashMap<ResourceKey, CoordinationError>,
    unlock_failures: HashMap<ResourceKey, CoordinationError>,
    connect_failure: Option<CoordinationError>,
    close_failure: Option<CoordinationError>,
    next_session: u64,
    open_sessions: Vec<String>,
}

/// In-memory coordination service
///
/// Sessions opened from clones of one adapter contend for the same keys, so
/// concurrent job runs can be simulated inside one test.
#[derive(Clone, Default)]
pub struct FakeCoordinationAdapter {
    state: Arc<Mutex<FakeState>>,
    calls: Arc<Mutex<Vec<CoordinationCall>>>,
    released: Arc<Notify>,
}

impl FakeCoordinationAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<CoordinationCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Keys passed to `lock`, in call order
    pub fn lock_attempts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                CoordinationCall::Lock { key, .. } => Some(key),
                _ => None,
            })
            .collect()
    }

    /// Keys passed to `unlock`, in call order
    pub fn unlock_attempts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                CoordinationCall::Unlock { key, .. } => Some(key),
                _ => None,
            })
            .collect()
    }

    /// Current holder of `key`, if any
    pub fn holder(&self, key: &str) -> Option<String> {
        let key = ResourceKey::parse(key).ok()?;
        self.state().holders.get(&key).cloned()
    }

    /// Sessions opened and not yet closed
    pub fn open_sessions(&self) -> Vec<String> {
        self.state().open_sessions.clone()
    }

    /// Make every `lock` on `key` fail with `error`
    pub fn fail_lock(&self, key: &str, error: CoordinationError) {
        if let Ok(key) = ResourceKey::parse(key) {
            self.state().lock_failures.insert(key, error);
        }
    }

    /// Make every `unlock` on `key` fail with `error`
    pub fn fail_unlock(&self, key: &str, error: CoordinationError) {
        if let Ok(key) = ResourceKey::parse(key) {
            self.state().unlock_failures.insert(key, error);
        }
    }

    /// Make `open_session` fail with `error`
    pub fn fail_connect(&self, error: CoordinationError) {
        self.state().connect_failure = Some(error);
    }

    /// Make session `close` fail with `error`
    pub fn fail_close(&self, error: CoordinationError) {
        self.state().close_failure = Some(error);
    }

    /// Occupy `key` as if another job held it
    pub fn hold_externally(&self, key: &str) {
        if let Ok(key) = ResourceKey::parse(key) {
            self.state().holders.insert(key, EXTERNAL_HOLDER.to_string());
        }
    }

    /// Release a key taken with [`Self::hold_externally`]
    pub fn release_externally(&self, key: &str) {
        if let Ok(key) = ResourceKey::parse(key) {
            let mut state = self.state();
            if state.holders.get(&key).map(String::as_str) == Some(EXTERNAL_HOLDER) {
                state.holders.remove(&key);
            }
        }
        self.released.notify_waiters();
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: CoordinationCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

#[async_trait]
impl CoordinationAdapter for FakeCoordinationAdapter {
    type Session = FakeSession;

    async fn open_session(&self, ttl: Duration) -> Result<Self::Session, CoordinationError> {
        self.record(CoordinationCall::OpenSession { ttl });

        let mut state = self.state();
        if let Some(error) = state.connect_failure.clone() {
            return Err(error);
        }

        state.next_session += 1;
        let id = format!("session-{}", state.next_session);
        state.open_sessions.push(id.clone());

        Ok(FakeSession {
            id,
            ttl,
            adapter: self.clone(),
        })
    }
}

/// Session handed out by [`FakeCoordinationAdapter`]
pub struct FakeSession {
    id: String,
    ttl: Duration,
    adapter: FakeCoordinationAdapter,
}

#[async_trait]
impl LockSession for FakeSession {
    type Mutex = FakeMutex;

    fn id(&self) -> &str {
        &self.id
    }

    fn lease_ttl(&self) -> Duration {
        self.ttl
    }

    fn new_mutex(&self, key: &ResourceKey) -> Self::Mutex {
        FakeMutex {
            key: key.clone(),
            session: self.id.clone(),
            adapter: self.adapter.clone(),
        }
    }

    async fn close(self) -> Result<(), CoordinationError> {
        self.adapter.record(CoordinationCall::CloseSession {
            session: self.id.clone(),
        });

        let result = {
            let mut state = self.adapter.state();
            state.open_sessions.retain(|s| s != &self.id);
            // Revoking the lease drops every lock it still scopes
            state.holders.retain(|_, holder| holder != &self.id);
            match state.close_failure.clone() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        };
        self.adapter.released.notify_waiters();
        result
    }
}

/// Mutex handed out by [`FakeSession`]
pub struct FakeMutex {
    key: ResourceKey,
    session: String,
    adapter: FakeCoordinationAdapter,
}

#[async_trait]
impl MutexHandle for FakeMutex {
    fn key(&self) -> &ResourceKey {
        &self.key
    }

    async fn lock(&mut self, timeout: Duration) -> Result<(), CoordinationError> {
        self.adapter.record(CoordinationCall::Lock {
            session: self.session.clone(),
            key: self.key.to_string(),
        });

        let deadline = Instant::now() + timeout;
        loop {
            // Register before checking so a release in between is not missed
            let released = self.adapter.released.notified();
            {
                let mut state = self.adapter.state();
                if let Some(error) = state.lock_failures.get(&self.key) {
                    return Err(error.clone());
                }
                match state.holders.get(&self.key) {
                    None => {
                        state.holders.insert(self.key.clone(), self.session.clone());
                        return Ok(());
                    }
                    Some(holder) if holder == &self.session => return Ok(()),
                    Some(_) => {}
                }
            }

            if tokio::time::timeout_at(deadline, released).await.is_err() {
                return Err(CoordinationError::Timeout(timeout));
            }
        }
    }

    async fn unlock(&mut self, _timeout: Duration) -> Result<(), CoordinationError> {
        self.adapter.record(CoordinationCall::Unlock {
            session: self.session.clone(),
            key: self.key.to_string(),
        });

        let result = {
            let mut state = self.adapter.state();
            if let Some(error) = state.unlock_failures.get(&self.key) {
                return Err(error.clone());
            }
            match state.holders.get(&self.key) {
                Some(holder) if holder == &self.session => {
                    state.holders.remove(&self.key);
                    Ok(())
                }
                _ => Err(CoordinationError::NotHeld(self.key.to_string())),
            }
        };
        self.adapter.released.notify_waiters();
        result
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
