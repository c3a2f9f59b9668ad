//! Integration tests for the `schedule` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to exercise the expand,
//! materialize and export subcommands through the actual binary, including
//! stdin/stdout piping, file I/O, configuration and error handling.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn stdout_json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).expect("stdout must be valid JSON")
}

// ─────────────────────────────────────────────────────────────────────────────
// Expand subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn expand_file_to_stdout() {
    let output = Command::cargo_bin("schedule")
        .unwrap()
        .args(["expand", "-i", &fixture("template.json")])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value = stdout_json(&output);
    let windows = value.as_array().unwrap();
    assert_eq!(windows.len(), 3);
    assert_eq!(windows[0]["sequenceNumber"], 1);
    assert_eq!(windows[1]["start"], "2025-01-13T09:00:00+00:00");
    assert_eq!(windows[2]["end"], "2025-01-20T10:00:00+00:00");
}

#[test]
fn expand_stdin_to_stdout() {
    let input = r#"{"startTime":"2026-03-01T09:00:00Z","endTime":"2026-03-01T09:30:00Z",
        "recurrence":{"type":"DAILY","intervalValue":2,"occurrenceCount":2}}"#;

    Command::cargo_bin("schedule")
        .unwrap()
        .arg("expand")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("2026-03-01T09:00:00+00:00"))
        .stdout(predicate::str::contains("2026-03-03T09:00:00+00:00"));
}

#[test]
fn expand_malformed_rule_fails() {
    let input = r#"{"startTime":"2026-03-01T09:00:00Z","endTime":"2026-03-01T10:00:00Z",
        "recurrence":{"type":"MONTHLY","occurrenceCount":2}}"#;

    Command::cargo_bin("schedule")
        .unwrap()
        .arg("expand")
        .write_stdin(input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed recurrence"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Materialize subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn materialize_resolves_conflicts() {
    let output = Command::cargo_bin("schedule")
        .unwrap()
        .args(["materialize", "-i", &fixture("request.json")])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value = stdout_json(&output);
    let instances = value["instances"].as_array().unwrap();
    assert_eq!(instances.len(), 4);
    // Jan 13 is taken; ROLLOVER moves the second Monday to Tuesday.
    assert_eq!(instances[1]["startTime"], "2025-01-14T09:00:00Z");
    assert_eq!(instances[1]["rolloverDays"], 1);

    let conflicts = value["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0]["templateIndex"], 1);
    assert_eq!(conflicts[0]["outcome"], "SKIPPED");
    assert!(conflicts[0]["reasons"][0]
        .as_str()
        .unwrap()
        .starts_with("location already booked: existing-2"));
}

#[test]
fn materialize_honours_config_file() {
    let output = Command::cargo_bin("schedule")
        .unwrap()
        .args([
            "--config",
            &fixture("engine.json"),
            "materialize",
            "-i",
            &fixture("request.json"),
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value = stdout_json(&output);
    assert_eq!(value["instances"].as_array().unwrap().len(), 3);
    assert_eq!(value["conflicts"][0]["outcome"], "ROLLOVER_EXHAUSTED");
}

#[test]
fn materialize_file_to_file() {
    let output_path = "/tmp/schedule-test-materialize-output.json";

    // Clean up from any prior run
    let _ = std::fs::remove_file(output_path);

    Command::cargo_bin("schedule")
        .unwrap()
        .args(["materialize", "-i", &fixture("request.json"), "-o", output_path])
        .assert()
        .success();

    let content = std::fs::read_to_string(output_path).expect("output file must exist");
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert!(value["instances"].is_array());

    let _ = std::fs::remove_file(output_path);
}

#[test]
fn materialize_invalid_json_fails() {
    Command::cargo_bin("schedule")
        .unwrap()
        .arg("materialize")
        .write_stdin("{not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid materialize request JSON"));
}

#[test]
fn missing_config_file_fails() {
    Command::cargo_bin("schedule")
        .unwrap()
        .args(["--config", "/nonexistent/engine.json", "expand", "-i", &fixture("template.json")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Export subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn export_prints_rrule_block() {
    Command::cargo_bin("schedule")
        .unwrap()
        .args(["export", "-i", &fixture("template.json")])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("DTSTART;TZID=UTC:20250106T090000"))
        .stdout(predicate::str::contains("FREQ=WEEKLY"))
        .stdout(predicate::str::contains("COUNT=3"));
}

#[test]
fn nonexistent_input_file_fails() {
    Command::cargo_bin("schedule")
        .unwrap()
        .args(["export", "-i", "/nonexistent/template.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}
