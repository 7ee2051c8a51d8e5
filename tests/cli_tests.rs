use std::fs;

use assert_cmd::{Command, cargo_bin_cmd};
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::TempDir;

const SAMPLE_LOG: &str = "Writing
2024/01/01 09:00:00
2024/01/01 09:25:00

Writing
2024/01/01 10:00:00
2024/01/01 10:25:00

";

/// Runs the binary with its home directory isolated in `home`.
fn pomo(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("pomo");
    cmd.env("POMO_HOME", home.path()).env_remove("RUST_LOG");
    cmd
}

fn write_log(home: &TempDir, content: &str) -> String {
    let path = home.path().join("pomo.log");
    fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn analyse_prints_the_sample_report() {
    let home = TempDir::new().unwrap();
    let log = write_log(&home, SAMPLE_LOG);

    pomo(&home)
        .args(["--analyse", &log, "--today", "2024/01/01"])
        .assert()
        .success()
        .stdout(contains("Task summary [pomos]"))
        .stdout(contains("Writing [2]"))
        .stdout(contains("2024-01-01 [2]"))
        .stdout(contains("Total time for today: 0:50:00"))
        .stdout(contains("Total time: 0:50:00"))
        .stdout(contains("Longest task: Writing at 0:50:00"));
}

#[test]
fn analyse_reports_truncation_and_continues() {
    let home = TempDir::new().unwrap();
    let log = write_log(&home, &format!("{SAMPLE_LOG}Reading\n"));

    pomo(&home)
        .args(["-a", &log, "--today", "2024/01/01"])
        .assert()
        .success()
        .stdout(contains("Log file contains invalid number of lines"))
        .stdout(contains("Writing [2]"))
        .stdout(contains("Reading").not());
}

#[test]
fn analyse_json_output() {
    let home = TempDir::new().unwrap();
    let log = write_log(&home, SAMPLE_LOG);

    let output = pomo(&home)
        .args(["--analyze", &log, "--today", "2024-01-01", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["tasks"][0]["task"], "Writing");
    assert_eq!(report["tasks"][0]["count"], 2);
    assert_eq!(report["total_today_secs"], 3000);
    assert_eq!(report["last_days"][0]["pomodoros"], 2);
}

#[test]
fn analyse_unreadable_log_exits_non_zero() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("nope.log");

    pomo(&home)
        .args(["--analyse", &missing.to_string_lossy()])
        .assert()
        .failure()
        .stderr(contains("Cannot load"));
}

#[test]
fn analyse_malformed_timestamp_exits_non_zero() {
    let home = TempDir::new().unwrap();
    let log = write_log(&home, "Writing\n2024/01/01 09:00:00\nlater\n");

    pomo(&home)
        .args(["--analyse", &log])
        .assert()
        .failure()
        .stderr(contains("line 3"));
}

#[test]
fn missing_analyse_argument_is_an_error() {
    let home = TempDir::new().unwrap();
    pomo(&home).arg("--analyse").assert().failure();
}

#[test]
fn headless_session_appends_one_entry() {
    let home = TempDir::new().unwrap();
    let log = home.path().join("sessions.log");

    pomo(&home)
        .env("POMO_TICK_MS", "1")
        .args(["--headless", "--no-sound", "-t", "Writing", "--log", &log.to_string_lossy()])
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .success()
        .stdout(contains("Working on: Writing"))
        .stdout(contains("Time's up!"));

    let content = fs::read_to_string(&log).unwrap();
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "Writing");
    assert_eq!(lines[3], "");

    // What was written reads back as one pomodoro.
    pomo(&home)
        .args(["--analyse", &log.to_string_lossy()])
        .assert()
        .success()
        .stdout(contains("Writing [1]"));
}
