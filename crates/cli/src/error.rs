// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-friendly error display with context and suggestions.
//!
//! A `CliError` carries:
//! - What went wrong (message)
//! - Why it might have happened (context)
//! - How to fix it (suggestions)
//! - The process exit status it maps to

use lockstep_adapters::{CoordinationError, Endpoint, EndpointError};
use lockstep_core::{KeyError, ReleaseReport};
use lockstep_engine::{AcquireReason, JobError};
use std::fmt;
use std::process::ExitCode;

/// Exit status for bad arguments or configuration
pub const EXIT_USAGE: u8 = 2;
/// Exit status for every other fatal error
pub const EXIT_FAILURE: u8 = 1;

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct CliError {
    /// What went wrong
    pub message: String,
    /// Why it might have happened
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
    /// Process exit status
    pub exit_code: u8,
}

impl CliError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
            exit_code: EXIT_FAILURE,
        }
    }

    /// Add context about why this error might have happened.
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    /// Add a suggestion for how to fix this error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_exit_code(mut self, code: u8) -> Self {
        self.exit_code = code;
        self
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_code)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for CliError {}

/// Common error builders for typical failure scenarios.
impl CliError {
    /// Error for a lock list that cannot be normalized.
    pub fn invalid_locks(err: &KeyError) -> Self {
        CliError::new(format!("Invalid --locks: {}", err))
            .with_context("Names are comma-separated, e.g. --locks db,cache")
            .with_suggestion("Remove empty entries and whitespace inside names")
            .with_exit_code(EXIT_USAGE)
    }

    /// Error for an endpoint list that names no usable backend.
    pub fn invalid_endpoints(err: &EndpointError) -> Self {
        CliError::new(format!("Invalid --endpoints: {}", err))
            .with_suggestion("Use host:port for etcd, e.g. --endpoints localhost:2379")
            .with_suggestion("Use a shared directory for the lease table: --endpoints file:///var/lock/lockstep")
            .with_exit_code(EXIT_USAGE)
    }

    /// Error for a config file or flag combination that fails validation.
    pub fn invalid_config(err: &anyhow::Error) -> Self {
        CliError::new(format!("{:#}", err)).with_exit_code(EXIT_USAGE)
    }

    /// Error for when the coordination service cannot be reached.
    pub fn connection_failed(endpoint: &Endpoint, err: &CoordinationError) -> Self {
        let err = CliError::new(format!("Cannot open lock session on {}", endpoint))
            .with_context(err.to_string());
        match endpoint {
            Endpoint::LeaseTable(_) => {
                err.with_suggestion("Check that the lease directory exists and is writable")
            }
            Endpoint::Etcd(_) => err
                .with_suggestion("Check that etcd is running and reachable")
                .with_suggestion("Raise --dial-timeout on slow networks"),
        }
    }

    /// Error for when one lock in the order cannot be acquired.
    pub fn lock_unavailable(key: &str, reason: &AcquireReason, release: &ReleaseReport) -> Self {
        let err = CliError::new(format!("Failed to acquire lock '{}'", key))
            .with_context(reason.to_string())
            .with_context(released(release));
        match reason {
            AcquireReason::Timeout(_) => err
                .with_suggestion("Wait for the current holder to finish")
                .with_suggestion("Raise --lock-timeout to wait longer"),
            AcquireReason::Cancelled => err,
            AcquireReason::Service(_) => {
                err.with_suggestion("Check the health of the coordination service")
            }
        }
    }

    /// Error for a workload that failed while every lock was held.
    pub fn workload_failed(reason: &str, exit_code: Option<i32>, release: &ReleaseReport) -> Self {
        let code = exit_code
            .and_then(|c| u8::try_from(c).ok())
            .filter(|c| *c != 0)
            .unwrap_or(EXIT_FAILURE);
        CliError::new(format!("Job failed: {}", reason))
            .with_context(released(release))
            .with_exit_code(code)
    }

    /// Error for a job interrupted by Ctrl-C or --deadline.
    pub fn cancelled(release: &ReleaseReport) -> Self {
        CliError::new("Job cancelled").with_context(released(release))
    }

    /// Map a job failure to its user-facing error.
    pub fn from_job(err: &JobError, endpoint: &Endpoint) -> Self {
        match err {
            JobError::InvalidArgument(e) => CliError::invalid_locks(e),
            JobError::Connection(e) => CliError::connection_failed(endpoint, e),
            JobError::AcquisitionFailed {
                failed_key,
                reason,
                release,
            } => CliError::lock_unavailable(failed_key.as_str(), reason, release),
            JobError::Workload {
                reason,
                exit_code,
                release,
            } => CliError::workload_failed(reason, *exit_code, release),
            JobError::Cancelled { release } => CliError::cancelled(release),
        }
    }
}

fn released(release: &ReleaseReport) -> String {
    format!(
        "Released {} of {} held locks",
        release.released_count(),
        release.attempted()
    )
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
