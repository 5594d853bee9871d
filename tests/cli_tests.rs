//! Integration tests for the CLI interface

mod common;

use assert_cmd::Command;
use common::{ranked_fixture, trade_file, RANKED_REPORT};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn tickervol() -> Command {
    let mut cmd = Command::cargo_bin("tickervol").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("TICKERVOL_MODE")
        .env_remove("TICKERVOL_WORKERS")
        .env_remove("TICKERVOL_WORKER_TIMEOUT")
        .env_remove("TICKERVOL_TOP");
    cmd
}

#[test]
fn test_cli_help() {
    tickervol()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("--mode"))
        .stdout(predicate::str::contains("--worker-timeout"));
}

#[test]
fn test_directory_named_worker_needs_dot_prefix() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join("worker");
    fs::create_dir(&dir).unwrap();
    trade_file(&dir, "A.csv", &["75", "125"]);

    tickervol()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("./worker"));

    tickervol()
        .current_dir(root.path())
        .arg("./worker")
        .assert()
        .success()
        .stdout(predicate::str::contains("A - 50.00 %"));
}

#[test]
fn test_shared_mode_report() {
    let dir = ranked_fixture();
    tickervol()
        .arg(dir.path())
        .assert()
        .success()
        .stdout(RANKED_REPORT)
        .stderr(predicate::str::contains("Failed to process").not());
}

#[test]
fn test_isolated_mode_report() {
    let dir = ranked_fixture();
    tickervol()
        .args(["--mode", "isolated", "--workers", "2"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(RANKED_REPORT);
}

#[test]
fn test_default_input_dir_is_trades() {
    let cwd = TempDir::new().unwrap();
    let trades = cwd.path().join("trades");
    fs::create_dir(&trades).unwrap();
    trade_file(&trades, "A.csv", &["75", "125"]);
    trade_file(&trades, "B.csv", &["42.5", "42.5", "42.5"]);
    trade_file(&trades, "C.csv", &["100", "140"]);
    trade_file(&trades, "D.csv", &["95", "105", "100"]);
    trade_file(&trades, "E.csv", &[]);

    tickervol()
        .current_dir(cwd.path())
        .assert()
        .success()
        .stdout(RANKED_REPORT);
}

#[test]
fn test_missing_directory_is_fatal() {
    let dir = TempDir::new().unwrap();
    tickervol()
        .arg(dir.path().join("absent"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("[E1001]"));
}

#[test]
fn test_malformed_file_is_reported_and_run_succeeds() {
    let dir = ranked_fixture();
    fs::write(
        dir.path().join("BAD.csv"),
        format!("{}X,10:00:00,12.5\n", common::HEADER),
    )
    .unwrap();

    tickervol()
        .arg(dir.path())
        .assert()
        .success()
        .stdout(RANKED_REPORT)
        .stderr(predicate::str::contains("Failed to process 1 file(s):"))
        .stderr(predicate::str::contains("BAD.csv - FileProcessingError"));
}

#[test]
fn test_top_and_json_format() {
    let dir = ranked_fixture();
    let output = tickervol()
        .args(["--top", "1", "--format", "json"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["files"], 5);
    assert_eq!(value["max"][0]["instrument_id"], "A");
    assert_eq!(value["min"][0]["instrument_id"], "D");
    assert_eq!(value["max"].as_array().unwrap().len(), 1);
    assert_eq!(value["zero"], serde_json::json!(["B", "E"]));
}

#[test]
fn test_env_and_config_file() {
    let dir = ranked_fixture();
    let config = dir.path().join("settings.toml");
    fs::write(&config, "top = 1\nextension = \"csv\"\n").unwrap();

    // the config file itself is not a .csv and must not be scanned
    tickervol()
        .arg("--config")
        .arg(&config)
        .env("TICKERVOL_TOP", "2")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("    C - 33.33 %"))
        .stdout(predicate::str::contains("    D - 10.00 %").count(1))
        .stderr(predicate::str::contains("Failed to process").not());
}

#[test]
fn test_invalid_config_is_fatal() {
    let dir = ranked_fixture();
    tickervol()
        .args(["--top", "0"])
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("[E2003]"));
}

#[test]
fn test_worker_subcommand_writes_one_message() {
    let dir = TempDir::new().unwrap();
    trade_file(dir.path(), "SBER.csv", &["75", "125"]);

    let output = tickervol()
        .arg("worker")
        .arg(dir.path().join("SBER.csv"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 1);
    let message: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(message["status"], "completed");
    assert_eq!(message["result"]["instrument_id"], "SBER");
}

#[test]
fn test_worker_subcommand_reports_failure() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("EMPTY.csv");
    fs::write(&path, "").unwrap();

    tickervol()
        .arg("worker")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\":\"failed\""))
        .stdout(predicate::str::contains("missing_header"));
}
