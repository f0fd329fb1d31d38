// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for job reports

use clap::ValueEnum;
use lockstep_core::ReleaseReport;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print output in the specified format
pub fn print<T: Serialize + std::fmt::Display>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", value),
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(value) {
                println!("{}", json);
            }
        }
    }
}

/// Report release failures on stderr; they never change the exit status.
pub fn warn_release_errors(report: &ReleaseReport) {
    for line in release_warnings(report) {
        eprintln!("{}", line);
    }
}

fn release_warnings(report: &ReleaseReport) -> Vec<String> {
    report
        .errors
        .iter()
        .map(|e| format!("warning: failed to release lock '{}': {}", e.key, e.reason))
        .collect()
}
