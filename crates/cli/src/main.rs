// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lockstep - run a job while holding locks on a set of shared resources

mod error;
mod job;
mod output;

use clap::Parser;
use output::OutputFormat;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "lockstep",
    version,
    about = "Run a job while holding locks on a set of shared resources",
    after_help = "Locks are always acquired in sorted order and released in reverse, \
                  so concurrent jobs over overlapping resources cannot deadlock."
)]
struct Cli {
    #[command(flatten)]
    job: job::JobArgs,

    /// Report format on stdout
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,

    /// Log debug detail to stderr
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match job::run(&cli.job).await {
        Ok(report) => {
            output::print(&report, cli.format);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprint!("{}", e);
            e.exit_code()
        }
    }
}

fn setup_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = match (verbose, quiet) {
        (true, _) => "debug",
        (_, true) => "warn",
        _ => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
