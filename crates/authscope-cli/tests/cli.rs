//! End-to-end tests for the `authscope` binary.
//!
//! Only commands that never touch the live system are exercised here.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn authscope(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("authscope").unwrap();
    cmd.env("AUTHSCOPE_CONFIG", config)
        .env_remove("RUST_LOG")
        .arg("--no-color");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    authscope(&dir.path().join("config.toml"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("discover"))
        .stdout(predicate::str::contains("monitor"))
        .stdout(predicate::str::contains("explore"));
}

#[test]
fn version_flag() {
    let dir = tempfile::tempdir().unwrap();
    authscope(&dir.path().join("config.toml"))
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("authscope"));
}

#[test]
fn unknown_output_format_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    authscope(&dir.path().join("config.toml"))
        .args(["probes", "--output", "csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("csv"));
}

#[test]
fn config_path_follows_env() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    authscope(&path)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn config_set_then_show() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf").join("config.toml");

    authscope(&path)
        .args(["config", "set", "skip_sections", "Sound,Wi-Fi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Success:"));
    assert!(path.exists());

    let output = authscope(&path)
        .args(["config", "show", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["skip_sections"], serde_json::json!(["Sound", "Wi-Fi"]));
    assert_eq!(shown["explore_by_default"], false);
}

#[test]
fn config_set_unknown_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    authscope(&path)
        .args(["config", "set", "api_key", "secret"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
    assert!(!path.exists());
}

#[test]
fn probes_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let output = authscope(&dir.path().join("config.toml"))
        .args(["probes", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<_> = listing["probes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect();
    assert!(names.contains(&"filevault".to_string()));
    assert!(names.contains(&"tcc_database".to_string()));
    assert!(!listing["sectionChecks"].as_array().unwrap().is_empty());
}

#[test]
fn configured_output_format_applies() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    authscope(&path)
        .args(["config", "set", "output_format", "yaml"])
        .assert()
        .success();

    authscope(&path)
        .arg("probes")
        .assert()
        .success()
        .stdout(predicate::str::contains("sectionChecks:"));
}
