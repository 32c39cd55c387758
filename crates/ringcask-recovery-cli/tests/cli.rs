//! Integration tests for the `ringcask-recover` binary, in the style of
//! `kimberlite-cli`'s `assert_cmd`-based tests.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_both_subcommands() {
    let mut cmd = Command::cargo_bin("ringcask-recover").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("merge"))
        .stdout(predicate::str::contains("dc"));
}

#[test]
fn missing_route_flag_fails_parsing() {
    let mut cmd = Command::cargo_bin("ringcask-recover").unwrap();
    cmd.args(["merge"]);
    cmd.assert().failure();
}

#[test]
fn merge_dry_run_against_bootstrap_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("ringcask-recover").unwrap();
    cmd.args([
        "merge",
        "-r",
        "127.0.0.1:9000:inet",
        "-D",
        dir.path().join("%TYPE%").to_str().unwrap(),
        "-N",
    ]);
    cmd.assert().success();
}

#[test]
fn malformed_bootstrap_address_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("ringcask-recover").unwrap();
    cmd.args([
        "dc",
        "-r",
        "not-a-valid-address",
        "-D",
        dir.path().join("%TYPE%").to_str().unwrap(),
    ]);
    cmd.assert().failure();
}

#[test]
fn second_concurrent_run_fails_on_held_lock() {
    let dir = tempfile::tempdir().unwrap();
    let tmp = dir.path().join("dc");
    std::fs::create_dir_all(&tmp).unwrap();
    std::fs::write(tmp.join("ringcask-recover.lock"), b"").unwrap();

    let mut cmd = Command::cargo_bin("ringcask-recover").unwrap();
    cmd.args([
        "dc",
        "-r",
        "127.0.0.1:9001:inet",
        "-D",
        dir.path().join("%TYPE%").to_str().unwrap(),
    ]);
    cmd.assert().failure();
}
