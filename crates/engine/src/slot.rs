// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job execution slot
//!
//! Runs the workload while every lock is held and reports how it ended.
//! Whatever the outcome, the caller releases afterwards.

use crate::cancel::CancelSignal;
use async_trait::async_trait;
use lockstep_core::JobOutcome;
use thiserror::Error;

/// Errors reported by a workload
#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with status {code}")]
    ExitStatus { program: String, code: i32 },
    #[error("{program} terminated by signal")]
    Signalled { program: String },
    #[error("{0}")]
    Failed(String),
}

impl WorkloadError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            WorkloadError::ExitStatus { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// The opaque unit of work run under the locks
#[async_trait]
pub trait Workload: Send {
    /// Short description for logs
    fn describe(&self) -> String;

    /// Run to completion. Dropping the future must stop the work.
    async fn run(&mut self) -> Result<(), WorkloadError>;
}

/// Run `workload` unless cancellation fires first.
pub async fn run_slot<W: Workload + ?Sized>(workload: &mut W, cancel: &CancelSignal) -> JobOutcome {
    let description = workload.describe();
    tracing::info!(workload = %description, "START job");

    let start = std::time::Instant::now();
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => JobOutcome::Cancelled,
        result = workload.run() => match result {
            Ok(()) => JobOutcome::Completed,
            Err(e) => JobOutcome::Failed {
                reason: e.to_string(),
                exit_code: e.exit_code(),
            },
        },
    };

    tracing::info!(
        workload = %description,
        elapsed_ms = start.elapsed().as_millis() as u64,
        %outcome,
        "FINISH job"
    );
    outcome
}

#[cfg(test)]
#[path = "slot_tests.rs"]
mod tests;
