// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lockstep_core::ResourceKey;
use std::path::PathBuf;
use std::time::Duration;
use yare::parameterized;

fn key(name: &str) -> ResourceKey {
    ResourceKey::parse(name).unwrap()
}

fn released(keys: &[&str]) -> ReleaseReport {
    let mut report = ReleaseReport::new();
    for k in keys {
        report.record_released(key(k));
    }
    report
}

#[test]
fn error_display() {
    let err = CliError::new("Something went wrong")
        .with_context("First context")
        .with_context("Second context")
        .with_suggestion("Try this")
        .with_suggestion("Or this");

    let output = format!("{}", err);
    assert!(output.contains("error: Something went wrong"));
    assert!(output.contains("-> First context"));
    assert!(output.contains("-> Second context"));
    assert!(output.contains("1. Try this"));
    assert!(output.contains("2. Or this"));
}

#[test]
fn invalid_locks_is_usage_error() {
    let err = CliError::invalid_locks(&KeyError::Empty);
    assert_eq!(err.exit_code, EXIT_USAGE);
    assert!(err.message.contains("--locks"));
}

#[test]
fn invalid_endpoints_is_usage_error() {
    let err = CliError::invalid_endpoints(&EndpointError::MixedSchemes);
    assert_eq!(err.exit_code, EXIT_USAGE);
}

#[test]
fn timeout_suggests_raising_lock_timeout() {
    let err = CliError::lock_unavailable(
        "db",
        &AcquireReason::Timeout(Duration::from_secs(10)),
        &released(&["cache"]),
    );

    let output = err.to_string();
    assert!(output.contains("Failed to acquire lock 'db'"));
    assert!(output.contains("Released 1 of 1 held locks"));
    assert!(output.contains("--lock-timeout"));
    assert_eq!(err.exit_code, EXIT_FAILURE);
}

#[test]
fn connection_suggestions_depend_on_backend() {
    let cause = CoordinationError::Service("refused".into());

    let table = CliError::connection_failed(&Endpoint::LeaseTable(PathBuf::from("/x")), &cause);
    assert!(table.suggestions[0].contains("directory"));

    let etcd = CliError::connection_failed(&Endpoint::Etcd(vec!["h:2379".into()]), &cause);
    assert!(etcd.suggestions.iter().any(|s| s.contains("--dial-timeout")));
}

#[parameterized(
    command_exit_code = { Some(3), 3 },
    no_exit_code = { None, 1 },
    out_of_range = { Some(300), 1 },
    negative = { Some(-1), 1 },
    zero = { Some(0), 1 },
)]
fn workload_exit_code(code: Option<i32>, expected: u8) {
    let err = CliError::workload_failed("boom", code, &released(&["a"]));
    assert_eq!(err.exit_code, expected);
}

#[test]
fn job_errors_map_to_exit_codes() {
    let endpoint = Endpoint::LeaseTable(PathBuf::from("/locks"));

    let invalid = JobError::InvalidArgument(KeyError::Empty);
    assert_eq!(CliError::from_job(&invalid, &endpoint).exit_code, EXIT_USAGE);

    let cancelled = JobError::Cancelled {
        release: released(&["b", "a"]),
    };
    let err = CliError::from_job(&cancelled, &endpoint);
    assert_eq!(err.exit_code, EXIT_FAILURE);
    assert!(err.context[0].contains("Released 2 of 2"));

    let failed = JobError::AcquisitionFailed {
        failed_key: key("b"),
        reason: AcquireReason::Cancelled,
        release: released(&["a"]),
    };
    assert!(CliError::from_job(&failed, &endpoint)
        .message
        .contains("'b'"));
}
