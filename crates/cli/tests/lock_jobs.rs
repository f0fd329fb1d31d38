// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI integration tests for lock jobs against a file lease table
//!
//! Each test gets its own lease directory, so tests can run in parallel.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn lockstep(table: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lockstep").unwrap();
    cmd.env_remove("RUST_LOG")
        .arg("--endpoints")
        .arg(format!("file://{}", table.display()));
    cmd
}

/// Block until `key`'s lock file records a holder
fn wait_until_held(table: &Path, key: &str) {
    let path = table.join(format!("{}.lock", key));
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(10) {
        if std::fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false) {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("lock {} was never taken", key);
}

#[test]
fn missing_locks_is_a_usage_error() {
    Command::cargo_bin("lockstep")
        .unwrap()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--locks"));
}

#[test]
fn empty_locks_is_a_usage_error() {
    let table = TempDir::new().unwrap();
    lockstep(table.path())
        .args(["--locks", ""])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid --locks"));
}

#[test]
fn malformed_name_reports_position() {
    let table = TempDir::new().unwrap();
    lockstep(table.path())
        .args(["--locks", "a,,b"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("position 2"));
}

#[test]
fn holds_locks_then_exits_zero() {
    let table = TempDir::new().unwrap();
    lockstep(table.path())
        .args(["--locks", "b,a,b", "--duration", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("job completed: held a,b"))
        .stdout(predicate::str::contains("released 2/2"));
}

#[test]
fn json_report() {
    let table = TempDir::new().unwrap();
    let output = lockstep(table.path())
        .args(["--locks", "Cache,db", "--duration", "0", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["order"], serde_json::json!(["cache", "db"]));
    assert_eq!(report["outcome"]["status"], "completed");
    assert_eq!(report["release"]["released"], serde_json::json!(["db", "cache"]));
    assert_eq!(report["release"]["errors"], serde_json::json!([]));
}

#[test]
fn command_runs_while_locks_are_held() {
    let table = TempDir::new().unwrap();
    let marker = table.path().join("ran");
    lockstep(table.path())
        .args(["--locks", "a", "--", "touch"])
        .arg(&marker)
        .assert()
        .success();
    assert!(marker.exists());
}

#[test]
fn command_exit_code_propagates() {
    let table = TempDir::new().unwrap();
    lockstep(table.path())
        .args(["--locks", "a", "--", "sh", "-c", "exit 3"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Job failed"));
}

#[test]
fn missing_program_fails() {
    let table = TempDir::new().unwrap();
    lockstep(table.path())
        .args(["--locks", "a", "--", "lockstep-no-such-program"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("lockstep-no-such-program"));
}

#[test]
fn contended_lock_times_out() {
    let table = TempDir::new().unwrap();
    let mut holder = std::process::Command::new(assert_cmd::cargo::cargo_bin("lockstep"))
        .arg("--endpoints")
        .arg(format!("file://{}", table.path().display()))
        .args(["--locks", "db", "--duration", "5s", "-q"])
        .spawn()
        .unwrap();
    wait_until_held(table.path(), "db");

    lockstep(table.path())
        .args(["--locks", "cache,db", "--lock-timeout", "200ms", "--duration", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to acquire lock 'db'"))
        .stderr(predicate::str::contains("Released 1 of 1 held locks"));

    holder.kill().unwrap();
    holder.wait().unwrap();
}

#[test]
fn deadline_cancels_the_job() {
    let table = TempDir::new().unwrap();
    lockstep(table.path())
        .args(["--locks", "a", "--duration", "30s", "--deadline", "100ms"])
        .timeout(Duration::from_secs(10))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Job cancelled"));
}

#[test]
fn mixed_endpoints_are_a_usage_error() {
    Command::cargo_bin("lockstep")
        .unwrap()
        .args([
            "--endpoints",
            "file:///tmp/lockstep,localhost:2379",
            "--locks",
            "a",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid --endpoints"));
}

#[test]
fn bad_config_file_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("lockstep.toml");
    std::fs::write(&config, "lock_timeout = \"never\"\n").unwrap();

    Command::cargo_bin("lockstep")
        .unwrap()
        .args(["--locks", "a", "--config"])
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("lockstep.toml"));
}

#[test]
fn short_lease_is_warned_about() {
    let table = TempDir::new().unwrap();
    lockstep(table.path())
        .args(["--locks", "a", "--duration", "0", "--session-ttl", "1s", "--lock-timeout", "5s"])
        .assert()
        .success()
        .stderr(predicate::str::contains("session lease may expire"));
}

#[test]
#[cfg(unix)]
fn sigterm_cancels_the_command_and_releases() {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    use std::process::Stdio;

    let table = TempDir::new().unwrap();
    let marker = table.path().join("finished");
    let child = std::process::Command::new(assert_cmd::cargo::cargo_bin("lockstep"))
        .env_remove("RUST_LOG")
        .arg("--endpoints")
        .arg(format!("file://{}", table.path().display()))
        .args(["--locks", "a", "--", "sh", "-c"])
        .arg(format!("sleep 2; touch '{}'", marker.display()))
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    wait_until_held(table.path(), "a");

    kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM).unwrap();
    let output = child.wait_with_output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("terminated, releasing locks"), "{}", stderr);
    assert!(stderr.contains("Job cancelled"), "{}", stderr);

    // The command was killed with the job, so it never finishes after the
    // lock is handed to someone else.
    lockstep(table.path())
        .args(["--locks", "a", "--lock-timeout", "200ms", "--duration", "0"])
        .assert()
        .success();
    std::thread::sleep(Duration::from_secs(3));
    assert!(!marker.exists());
}
