// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered multi-resource lock coordinator
//!
//! One job run: normalize → open session → acquire in order → run workload →
//! release in reverse → close session. Once a session is open, release and
//! close run exactly once on every exit path.

use crate::acquire::{acquire_all, AcquisitionFailure};
use crate::cancel::CancelSignal;
use crate::error::JobError;
use crate::release::release_all;
use crate::slot::{run_slot, Workload};
use lockstep_adapters::{CoordinationAdapter, LockSession};
use lockstep_core::{AcquisitionOrder, CoordinatorConfig, JobOutcome, ReleaseReport};
use serde::Serialize;
use std::time::Instant;

/// Summary of a successful job run
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub order: AcquisitionOrder,
    pub session_id: String,
    pub outcome: JobOutcome,
    pub release: ReleaseReport,
    /// Time spent acquiring every lock
    pub lock_wait_ms: u64,
    /// Time the workload ran with every lock held
    pub held_ms: u64,
}

impl std::fmt::Display for JobReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "job {}: held {} for {}ms after waiting {}ms (session {}, released {}/{})",
            self.outcome,
            self.order,
            self.held_ms,
            self.lock_wait_ms,
            self.session_id,
            self.release.released_count(),
            self.release.attempted(),
        )
    }
}

/// Runs jobs under ordered locks against one coordination service
pub struct Coordinator<C> {
    adapter: C,
    config: CoordinatorConfig,
}

impl<C: CoordinationAdapter> Coordinator<C> {
    pub fn new(adapter: C, config: CoordinatorConfig) -> Self {
        Self { adapter, config }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Run `workload` holding locks on every resource in `names`.
    ///
    /// Names are normalized before the service is contacted; an empty or
    /// malformed set never opens a session.
    pub async fn run<I, S, W>(
        &self,
        names: I,
        workload: &mut W,
        cancel: &CancelSignal,
    ) -> Result<JobReport, JobError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        W: Workload + ?Sized,
    {
        let order = AcquisitionOrder::from_names(names)?;
        self.run_order(order, workload, cancel).await
    }

    /// Run `workload` holding locks on an already normalized order
    pub async fn run_order<W>(
        &self,
        order: AcquisitionOrder,
        workload: &mut W,
        cancel: &CancelSignal,
    ) -> Result<JobReport, JobError>
    where
        W: Workload + ?Sized,
    {
        let session = self
            .adapter
            .open_session(self.config.session_ttl)
            .await
            .map_err(JobError::Connection)?;
        let session_id = session.id().to_string();
        tracing::info!(session_id, %order, "session opened");

        let wait_start = Instant::now();
        let acquired = acquire_all(&session, &order, self.config.lock_timeout, cancel).await;
        let lock_wait_ms = wait_start.elapsed().as_millis() as u64;

        let stack = match acquired {
            Ok(stack) => stack,
            Err(AcquisitionFailure {
                failed_key,
                reason,
                partially_held,
            }) => {
                let release = release_all(partially_held, self.config.release_timeout).await;
                self.close(session).await;
                log_release(&release);
                return Err(JobError::AcquisitionFailed {
                    failed_key,
                    reason,
                    release,
                });
            }
        };

        let held_start = Instant::now();
        let outcome = run_slot(workload, cancel).await;
        let held_ms = held_start.elapsed().as_millis() as u64;

        let release = release_all(stack, self.config.release_timeout).await;
        self.close(session).await;
        log_release(&release);

        match outcome {
            JobOutcome::Completed => Ok(JobReport {
                order,
                session_id,
                outcome,
                release,
                lock_wait_ms,
                held_ms,
            }),
            JobOutcome::Failed { reason, exit_code } => Err(JobError::Workload {
                reason,
                exit_code,
                release,
            }),
            JobOutcome::Cancelled => Err(JobError::Cancelled { release }),
        }
    }

    /// Close the session; failure is logged only since the lease expires on its own.
    async fn close(&self, session: C::Session) {
        let session_id = session.id().to_string();
        if let Err(e) = session.close().await {
            tracing::warn!(session_id, error = %e, "failed to close session");
        }
    }
}

fn log_release(report: &ReleaseReport) {
    if report.is_clean() {
        tracing::debug!(released = report.released_count(), "release complete");
    } else {
        tracing::warn!(
            released = report.released_count(),
            failed = report.errors.len(),
            "release finished with errors"
        );
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
