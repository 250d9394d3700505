//! Integration tests for the operator commands and argument parsing.

#![allow(deprecated)] // Command::cargo_bin is deprecated but replacement requires newer assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const SHIPPED_POLICY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../policies/default.toml");

fn attrgate(project: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("attrgate").unwrap();
    cmd.current_dir(project.path())
        .env("HOME", project.path())
        .env("XDG_CONFIG_HOME", project.path().join(".config"))
        .env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// Argument Parsing
// ============================================================================

#[test]
fn help_lists_subcommands() {
    let temp = TempDir::new().unwrap();
    attrgate(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("eval"))
        .stdout(predicate::str::contains("explain"))
        .stdout(predicate::str::contains("policy"));
}

#[test]
fn version_command() {
    let temp = TempDir::new().unwrap();
    attrgate(&temp)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!(
            "attrgate {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn unknown_flush_mode_is_rejected() {
    let temp = TempDir::new().unwrap();
    attrgate(&temp)
        .args(["eval", "--flush", "sometimes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn config_and_config_dir_conflict() {
    let temp = TempDir::new().unwrap();
    attrgate(&temp)
        .args(["--config", "a.toml", "--config-dir", ".", "eval"])
        .assert()
        .failure();
}

#[test]
fn invalid_log_level_is_rejected() {
    let temp = TempDir::new().unwrap();
    attrgate(&temp)
        .args(["--log-level", "attrgate=loud", "eval"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid log level"));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn explicit_config_file_sets_record_limit() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("strict.toml");
    fs::write(&config, "[pipeline]\nmax_record_bytes = 8\n").unwrap();

    attrgate(&temp)
        .args(["--config", config.to_str().unwrap(), "eval"])
        .write_stdin("{\"azure.authenticated\":\"true\",\"azure.role\":\"admin\"}\n")
        .assert()
        .success()
        .stdout("unauthorized\n");
}

#[test]
fn config_dir_flag_reads_project_config() {
    let temp = TempDir::new().unwrap();
    let project = temp.path().join("project");
    fs::create_dir(&project).unwrap();
    fs::write(
        project.join("attrgate.toml"),
        "[pipeline]\nmax_record_bytes = 0\n",
    )
    .unwrap();

    attrgate(&temp)
        .args(["--config-dir", project.to_str().unwrap(), "eval"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn missing_config_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    attrgate(&temp)
        .args(["--config", "missing.toml", "eval"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config file"));
}

// ============================================================================
// Policy Commands
// ============================================================================

#[test]
fn policy_check_accepts_shipped_policy() {
    let temp = TempDir::new().unwrap();
    attrgate(&temp)
        .args(["policy", "check", SHIPPED_POLICY])
        .assert()
        .success()
        .stdout(predicate::str::contains("Policy OK"))
        .stdout(predicate::str::contains("authentication-gate"))
        .stdout(predicate::str::contains("default: deny"));
}

#[test]
fn policy_check_rejects_duplicate_rules() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("dup.toml");
    fs::write(
        &path,
        r#"
[[rules]]
name = "twice"
effect = "allow"

[[rules]]
name = "twice"
effect = "deny"
"#,
    )
    .unwrap();

    attrgate(&temp)
        .args(["policy", "check", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is invalid"));
}

#[test]
fn policy_check_rejects_unknown_extension() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("policy.yaml");
    fs::write(&path, "rules: []\n").unwrap();

    attrgate(&temp)
        .args(["policy", "check", path.to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn policy_show_json_is_parseable() {
    let temp = TempDir::new().unwrap();
    let output = attrgate(&temp)
        .args(["policy", "show", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let policy: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(policy["default_effect"], "deny");
    assert_eq!(policy["rules"].as_array().unwrap().len(), 4);
}

#[test]
fn policy_show_toml_round_trips_through_check() {
    let temp = TempDir::new().unwrap();
    let output = attrgate(&temp).args(["policy", "show"]).output().unwrap();
    assert!(output.status.success());

    let path = temp.path().join("exported.toml");
    fs::write(&path, &output.stdout).unwrap();

    attrgate(&temp)
        .args(["policy", "check", path.to_str().unwrap()])
        .assert()
        .success();
}

// ============================================================================
// Explain
// ============================================================================

#[test]
fn explain_names_matching_rule() {
    let temp = TempDir::new().unwrap();
    attrgate(&temp)
        .args([
            "explain",
            r#"{"azure.authenticated":"true","azure.role":"admin"}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("decision: authorized"))
        .stdout(predicate::str::contains("admin-override"));
}

#[test]
fn explain_reports_ignored_keys() {
    let temp = TempDir::new().unwrap();
    attrgate(&temp)
        .args([
            "explain",
            r#"{"azure.authenticated":"true","azure.role":"user","x-trace":"1"}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("decision: unauthorized"))
        .stdout(predicate::str::contains("ignored:  x-trace"));
}

#[test]
fn explain_json_distinguishes_malformed_records() {
    let temp = TempDir::new().unwrap();
    let output = attrgate(&temp)
        .args(["explain", "--json", "{not json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["decision"], "unauthorized");
    assert!(report["matched_rule"].is_null());
    assert!(
        report["reason"]
            .as_str()
            .unwrap()
            .starts_with("Malformed record (syntax)")
    );
}
