// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job outcomes and release reports

use crate::key::ResourceKey;
use serde::Serialize;

/// Result of running the workload while all locks are held
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Completed,
    Failed {
        reason: String,
        /// Exit code when the workload was an external process
        exit_code: Option<i32>,
    },
    Cancelled,
}

impl JobOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        JobOutcome::Failed {
            reason: reason.into(),
            exit_code: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Completed)
    }
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobOutcome::Completed => write!(f, "completed"),
            JobOutcome::Failed { reason, .. } => write!(f, "failed: {}", reason),
            JobOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A single lock that could not be released
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReleaseError {
    pub key: ResourceKey,
    pub reason: String,
}

/// Summary of a release sweep
///
/// `released` and `errors` are both in release order, i.e. the reverse of
/// acquisition order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReleaseReport {
    pub released: Vec<ResourceKey>,
    pub errors: Vec<ReleaseError>,
}

impl ReleaseReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_released(&mut self, key: ResourceKey) {
        self.released.push(key);
    }

    pub fn record_error(&mut self, key: ResourceKey, reason: impl Into<String>) {
        self.errors.push(ReleaseError {
            key,
            reason: reason.into(),
        });
    }

    pub fn released_count(&self) -> usize {
        self.released.len()
    }

    /// Number of release attempts made, successful or not
    pub fn attempted(&self) -> usize {
        self.released.len() + self.errors.len()
    }

    /// True when every attempted release succeeded
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
