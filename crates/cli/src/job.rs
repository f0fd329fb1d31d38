// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Running one job from command-line arguments

use crate::error::CliError;
use crate::output::warn_release_errors;
use anyhow::Context;
use clap::Args;
use lockstep_adapters::{
    CoordinationAdapter, Endpoint, LeaseTableAdapter, TracedCoordinationAdapter,
};
use lockstep_core::{parse_duration, AcquisitionOrder, CoordinatorConfig, KeyError};
use lockstep_engine::{
    cancel_pair, CancelHandle, CancelSignal, CommandWorkload, Coordinator, JobError, JobReport,
    SleepWorkload, Workload,
};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Args, Debug)]
pub struct JobArgs {
    /// Coordination endpoints: etcd host:port addresses, or file:///dir for a
    /// lease table in a shared directory [default: localhost:2379]
    #[arg(long, alias = "server", value_delimiter = ',')]
    pub endpoints: Vec<String>,

    /// Comma-separated resources to lock
    #[arg(long)]
    pub locks: String,

    /// How long to hold the locks when no command is given
    #[arg(long, value_parser = parse_duration, default_value = "5s")]
    pub duration: Duration,

    /// Per-lock acquisition timeout [default: 10s]
    #[arg(long, value_parser = parse_duration)]
    pub lock_timeout: Option<Duration>,

    /// Per-lock release timeout [default: 10s]
    #[arg(long, value_parser = parse_duration)]
    pub release_timeout: Option<Duration>,

    /// Session lease TTL [default: 120s]
    #[arg(long, value_parser = parse_duration)]
    pub session_ttl: Option<Duration>,

    /// Connection timeout [default: 10s]
    #[arg(long, value_parser = parse_duration)]
    pub dial_timeout: Option<Duration>,

    /// Timeout for session requests such as lease grant [default: 10s]
    #[arg(long, value_parser = parse_duration)]
    pub request_timeout: Option<Duration>,

    /// Prefix for keys sent to the coordination service [default: /]
    #[arg(long)]
    pub key_prefix: Option<String>,

    /// Cancel the whole job after this long
    #[arg(long, value_parser = parse_duration)]
    pub deadline: Option<Duration>,

    /// TOML config file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Command to run while holding the locks
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl JobArgs {
    /// Config file (or defaults) with flag overrides applied
    pub fn coordinator_config(&self) -> anyhow::Result<CoordinatorConfig> {
        let mut config = match &self.config {
            Some(path) => CoordinatorConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => CoordinatorConfig::default(),
        };

        if !self.endpoints.is_empty() {
            config = config.with_endpoints(self.endpoints.iter().cloned());
        }
        if let Some(timeout) = self.lock_timeout {
            config = config.with_lock_timeout(timeout);
        }
        if let Some(timeout) = self.release_timeout {
            config = config.with_release_timeout(timeout);
        }
        if let Some(ttl) = self.session_ttl {
            config = config.with_session_ttl(ttl);
        }
        if let Some(timeout) = self.dial_timeout {
            config.dial_timeout = timeout;
        }
        if let Some(timeout) = self.request_timeout {
            config.request_timeout = timeout;
        }
        if let Some(prefix) = &self.key_prefix {
            config.key_prefix = prefix.clone();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn order(&self) -> Result<AcquisitionOrder, KeyError> {
        AcquisitionOrder::parse_list(&self.locks)
    }

    pub fn workload(&self) -> Box<dyn Workload> {
        match CommandWorkload::from_argv(&self.command) {
            Some(command) => Box::new(command),
            None => Box::new(SleepWorkload::new(self.duration)),
        }
    }

    /// Hold time known before the run; a command runs for as long as it takes.
    pub fn planned_hold(&self) -> Option<Duration> {
        self.command.is_empty().then_some(self.duration)
    }
}

/// Run the job described by `args` and report release failures on stderr.
pub async fn run(args: &JobArgs) -> Result<JobReport, CliError> {
    let config = args
        .coordinator_config()
        .map_err(|e| CliError::invalid_config(&e))?;
    let order = args.order().map_err(|e| CliError::invalid_locks(&e))?;
    let endpoint =
        Endpoint::parse(&config.endpoints).map_err(|e| CliError::invalid_endpoints(&e))?;

    if let Some(hold) = args.planned_hold() {
        if !config.lease_covers(hold, order.len()) {
            tracing::warn!(
                session_ttl = ?config.session_ttl,
                worst_case = ?config.worst_case_hold(hold, order.len()),
                "session lease may expire before the job finishes"
            );
        }
    }

    let (handle, signal) = cancel_pair();
    let canceller = spawn_canceller(handle, args.deadline);
    let mut workload = args.workload();
    tracing::debug!(%endpoint, %order, workload = %workload.describe(), "starting job");

    let result = match &endpoint {
        Endpoint::LeaseTable(dir) => {
            execute(
                LeaseTableAdapter::new(dir.clone()),
                config,
                order,
                workload.as_mut(),
                &signal,
            )
            .await
        }
        Endpoint::Etcd(_) => execute_etcd(config, order, workload.as_mut(), &signal).await,
    };
    canceller.abort();

    match result {
        Ok(report) => {
            warn_release_errors(&report.release);
            Ok(report)
        }
        Err(e) => {
            if let Some(release) = e.release_report() {
                warn_release_errors(release);
            }
            Err(CliError::from_job(&e, &endpoint))
        }
    }
}

async fn execute<C: CoordinationAdapter>(
    adapter: C,
    config: CoordinatorConfig,
    order: AcquisitionOrder,
    workload: &mut dyn Workload,
    cancel: &CancelSignal,
) -> Result<JobReport, JobError> {
    Coordinator::new(TracedCoordinationAdapter::new(adapter), config)
        .run_order(order, workload, cancel)
        .await
}

#[cfg(feature = "etcd")]
async fn execute_etcd(
    config: CoordinatorConfig,
    order: AcquisitionOrder,
    workload: &mut dyn Workload,
    cancel: &CancelSignal,
) -> Result<JobReport, JobError> {
    let adapter = lockstep_adapters::EtcdAdapter::connect(&config)
        .await
        .map_err(JobError::Connection)?;
    execute(adapter, config, order, workload, cancel).await
}

#[cfg(not(feature = "etcd"))]
async fn execute_etcd(
    _config: CoordinatorConfig,
    _order: AcquisitionOrder,
    _workload: &mut dyn Workload,
    _cancel: &CancelSignal,
) -> Result<JobReport, JobError> {
    Err(JobError::Connection(
        lockstep_adapters::CoordinationError::Unsupported(
            "etcd support is not compiled in; rebuild with --features etcd or use a file:// endpoint"
                .to_string(),
        ),
    ))
}

/// Cancel the job on Ctrl-C, SIGTERM, or once `deadline` passes.
///
/// The SIGTERM handler is installed before returning, so a job that is
/// already holding locks never dies with the default signal action.
fn spawn_canceller(handle: CancelHandle, deadline: Option<Duration>) -> JoinHandle<()> {
    let terminated = terminate_signal();
    tokio::spawn(async move {
        let expired = async move {
            match deadline {
                Some(after) => tokio::time::sleep(after).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            Ok(()) = tokio::signal::ctrl_c() => {
                tracing::warn!("interrupted, releasing locks");
            }
            () = terminated => {
                tracing::warn!("terminated, releasing locks");
            }
            () = expired => {
                tracing::warn!(?deadline, "deadline reached, releasing locks");
            }
        }
        handle.cancel();
    })
}

#[cfg(unix)]
fn terminate_signal() -> impl Future<Output = ()> + Send + 'static {
    use tokio::signal::unix::{signal, SignalKind};

    let sigterm = signal(SignalKind::terminate());
    async move {
        match sigterm {
            Ok(mut sigterm) => {
                if sigterm.recv().await.is_none() {
                    std::future::pending::<()>().await;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
fn terminate_signal() -> impl Future<Output = ()> + Send + 'static {
    std::future::pending()
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
