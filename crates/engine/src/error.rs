// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for a job run

use crate::acquire::AcquireReason;
use lockstep_adapters::CoordinationError;
use lockstep_core::{KeyError, ReleaseReport, ResourceKey};
use thiserror::Error;

/// Fatal outcomes of a job run.
///
/// Variants raised after a session was opened carry the report of the
/// release sweep that ran before the error was returned.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] KeyError),
    #[error("cannot open lock session: {0}")]
    Connection(#[source] CoordinationError),
    #[error("failed to acquire lock {failed_key}: {reason}")]
    AcquisitionFailed {
        failed_key: ResourceKey,
        reason: AcquireReason,
        release: ReleaseReport,
    },
    #[error("workload failed: {reason}")]
    Workload {
        reason: String,
        exit_code: Option<i32>,
        release: ReleaseReport,
    },
    #[error("job cancelled")]
    Cancelled { release: ReleaseReport },
}

impl JobError {
    /// Release sweep that ran before this error, if any locks could have been held
    pub fn release_report(&self) -> Option<&ReleaseReport> {
        match self {
            JobError::InvalidArgument(_) | JobError::Connection(_) => None,
            JobError::AcquisitionFailed { release, .. }
            | JobError::Workload { release, .. }
            | JobError::Cancelled { release } => Some(release),
        }
    }
}
