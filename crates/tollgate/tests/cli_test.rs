//! Integration tests for the `tollgate` binary.
//!
//! These validate argument parsing, help output, and config error
//! handling -- all without a live Bot API.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `tollgate` binary with env isolation.
///
/// Points config directories at a nonexistent path and clears all
/// `TOLLGATE_*` env vars so tests never touch real configuration.
fn tollgate_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("tollgate");
    cmd.env("HOME", "/tmp/tollgate-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/tollgate-test-nonexistent")
        .env_remove("TOLLGATE_TOKEN")
        .env_remove("TOLLGATE_API_URL");
    cmd
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn help_flag_describes_the_daemon() {
    tollgate_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("payment-gated")
            .and(predicate::str::contains("--config"))
            .and(predicate::str::contains("--verbose")),
    );
}

#[test]
fn version_flag_works() {
    tollgate_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tollgate"));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    tollgate_cmd().arg("--nonsense").assert().failure();
}

#[test]
fn missing_token_fails_with_config_exit_code() {
    let output = tollgate_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "expected config exit code");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("token"), "expected token hint:\n{stderr}");
}
