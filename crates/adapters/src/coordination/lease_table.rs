// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed lease table
//!
//! Each key maps to a lock file in a shared directory, held with an exclusive
//! advisory lock. The OS drops the lock when the holder exits, which stands in
//! for lease expiry.
//!
//! Lock files outlive their locks: unlock truncates the holder id but keeps
//! the file, so the directory holds one file per key ever locked. Removing it
//! would let a waiter that already opened the old inode lock a file nobody
//! else can see, breaking exclusion. Prune the directory only while no job is
//! running.

use super::{CoordinationAdapter, CoordinationError, LockSession, MutexHandle};
use async_trait::async_trait;
use fs2::FileExt;
use lockstep_core::ResourceKey;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lease table rooted at a directory shared by all contending jobs
#[derive(Clone, Debug)]
pub struct LeaseTableAdapter {
    dir: PathBuf,
    poll_interval: Duration,
}

impl LeaseTableAdapter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// How often a waiting lock re-checks its file
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl CoordinationAdapter for LeaseTableAdapter {
    type Session = LeaseTableSession;

    async fn open_session(&self, ttl: Duration) -> Result<Self::Session, CoordinationError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| CoordinationError::Connect {
            endpoints: format!("file://{}", self.dir.display()),
            message: e.to_string(),
        })?;

        Ok(LeaseTableSession {
            id: uuid::Uuid::new_v4().simple().to_string(),
            dir: self.dir.clone(),
            ttl,
            poll_interval: self.poll_interval,
        })
    }
}

/// Session over a lease table directory
#[derive(Debug)]
pub struct LeaseTableSession {
    id: String,
    dir: PathBuf,
    ttl: Duration,
    poll_interval: Duration,
}

#[async_trait]
impl LockSession for LeaseTableSession {
    type Mutex = LeaseTableMutex;

    fn id(&self) -> &str {
        &self.id
    }

    fn lease_ttl(&self) -> Duration {
        self.ttl
    }

    fn new_mutex(&self, key: &ResourceKey) -> Self::Mutex {
        LeaseTableMutex {
            key: key.clone(),
            path: self.dir.join(lock_file_name(key)),
            session_id: self.id.clone(),
            poll_interval: self.poll_interval,
            file: None,
        }
    }

    async fn close(self) -> Result<(), CoordinationError> {
        // Locks live on their mutex handles; nothing is registered per session.
        Ok(())
    }
}

/// Exclusive lock on one lock file
#[derive(Debug)]
pub struct LeaseTableMutex {
    key: ResourceKey,
    path: PathBuf,
    session_id: String,
    poll_interval: Duration,
    file: Option<File>,
}

impl LeaseTableMutex {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<File, CoordinationError> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| {
                CoordinationError::Service(format!("{}: {}", self.path.display(), e))
            })
    }
}

#[async_trait]
impl MutexHandle for LeaseTableMutex {
    fn key(&self) -> &ResourceKey {
        &self.key
    }

    async fn lock(&mut self, timeout: Duration) -> Result<(), CoordinationError> {
        if self.file.is_some() {
            return Ok(());
        }

        let file = self.open()?;
        let deadline = Instant::now() + timeout;
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => break,
                Err(e) if is_contended(&e) => {}
                Err(e) => return Err(CoordinationError::Service(e.to_string())),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(CoordinationError::Timeout(timeout));
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }

        // Holder id is informational; the flock is what excludes others.
        if let Err(e) = record_holder(&file, &self.session_id) {
            tracing::debug!(path = %self.path.display(), error = %e, "could not record holder");
        }
        self.file = Some(file);
        Ok(())
    }

    async fn unlock(&mut self, _timeout: Duration) -> Result<(), CoordinationError> {
        let file = self
            .file
            .take()
            .ok_or_else(|| CoordinationError::NotHeld(self.key.to_string()))?;

        if let Err(e) = file.set_len(0) {
            tracing::debug!(path = %self.path.display(), error = %e, "could not clear holder");
        }
        FileExt::unlock(&file).map_err(|e| CoordinationError::Service(e.to_string()))
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn record_holder(file: &File, session_id: &str) -> std::io::Result<()> {
    file.set_len(0)?;
    let mut writer = file;
    writeln!(writer, "{}", session_id)?;
    writer.flush()
}

/// Map a key onto a flat file name; anything outside `[a-z0-9._-]` is
/// percent-encoded so nested keys like `db/users` stay in one directory.
pub(crate) fn lock_file_name(key: &ResourceKey) -> String {
    let mut name = String::with_capacity(key.as_str().len() + 5);
    for byte in key.as_str().bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => name.push(byte as char),
            other => name.push_str(&format!("%{:02x}", other)),
        }
    }
    name.push_str(".lock");
    name
}

#[cfg(test)]
#[path = "lease_table_tests.rs"]
mod tests;
