// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in workloads

use crate::slot::{Workload, WorkloadError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

/// Hold the locks for a fixed duration
#[derive(Debug, Clone)]
pub struct SleepWorkload {
    duration: Duration,
}

impl SleepWorkload {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

#[async_trait]
impl Workload for SleepWorkload {
    fn describe(&self) -> String {
        format!("sleep {:?}", self.duration)
    }

    async fn run(&mut self) -> Result<(), WorkloadError> {
        tokio::time::sleep(self.duration).await;
        Ok(())
    }
}

/// Run an external command while the locks are held
#[derive(Debug, Clone)]
pub struct CommandWorkload {
    program: String,
    args: Vec<String>,
}

impl CommandWorkload {
    /// `argv[0]` is the program; returns `None` for an empty argv.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl Workload for CommandWorkload {
    fn describe(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn run(&mut self) -> Result<(), WorkloadError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| WorkloadError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let status = child.wait().await.map_err(|e| {
            WorkloadError::Failed(format!("waiting for {}: {}", self.program, e))
        })?;

        if status.success() {
            return Ok(());
        }
        match status.code() {
            Some(code) => Err(WorkloadError::ExitStatus {
                program: self.program.clone(),
                code,
            }),
            None => Err(WorkloadError::Signalled {
                program: self.program.clone(),
            }),
        }
    }
}
