use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

use launchpad_core::state::{config_path_at, save_config_at, SavedConfig};

fn launchpad_cmd(workdir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("launchpad"));
    cmd.current_dir(workdir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    launchpad_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("deploy"))
        .stdout(contains("status"))
        .stdout(contains("upload-cache"))
        .stdout(contains("--namespace"));
}

#[test]
fn unknown_flag_is_rejected() {
    let dir = TempDir::new().unwrap();
    launchpad_cmd(dir.path())
        .arg("--no-such-flag")
        .assert()
        .failure()
        .stderr(contains("--no-such-flag"));
}

#[test]
fn uninferable_domain_fails_before_any_stage() {
    let dir = TempDir::new().unwrap();
    launchpad_cmd(dir.path())
        .args(["--api", "https://cluster.example.com"])
        .assert()
        .failure()
        .stderr(contains("--domain"));

    assert!(!config_path_at(dir.path()).exists());
}

#[test]
fn deploy_without_env_file_fails_and_saves_nothing() {
    let dir = TempDir::new().unwrap();
    launchpad_cmd(dir.path())
        .args(["deploy", "--domain", "apps.demo.example.com"])
        .assert()
        .failure()
        .stderr(contains("credential file not found"));

    assert!(!config_path_at(dir.path()).exists());
    assert!(dir.path().join(".launchpad/logs/deploy.log").exists());
}

#[test]
fn diff_shows_routes_for_new_domain_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let assert = launchpad_cmd(dir.path())
        .args(["diff", "--domain", "apps.demo.example.com"])
        .assert()
        .success()
        .stdout(contains("rfe-builder-api.apps.demo.example.com"));
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();

    assert!(
        stdout
            .lines()
            .any(|line| line.starts_with('+') && line.contains("host: rfe-builder.apps.demo.example.com")),
        "expected an added host line for the frontend route"
    );
    assert!(!dir.path().join("openshift").exists());
}

#[test]
fn status_json_reports_saved_target_and_no_apply() {
    let dir = TempDir::new().unwrap();
    save_config_at(
        dir.path(),
        &SavedConfig {
            api: "https://api.prod.example.com:6443".to_string(),
            domain: "apps.prod.example.com".to_string(),
            namespace: "saved-ns".to_string(),
            project: "rfe-builder".to_string(),
            registry: "quay.io/acme".to_string(),
        },
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("document_cache")).unwrap();
    fs::write(dir.path().join("document_cache/chunks.json"), "[]").unwrap();

    let assert = launchpad_cmd(dir.path())
        .args(["status", "--json"])
        .assert()
        .success();
    let payload: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).unwrap();

    assert_eq!(payload["target"]["namespace"], "saved-ns");
    assert_eq!(payload["target"]["domain"], "apps.prod.example.com");
    assert_eq!(payload["needs_apply"], true);
    let items = payload["items"].as_array().unwrap();
    let last_apply = items.iter().find(|i| i["item"] == "last apply").unwrap();
    assert_eq!(last_apply["status"], "never");
    let documents = items.iter().find(|i| i["item"] == "document cache").unwrap();
    assert_eq!(documents["status"], "current");
    assert!(documents["detail"].as_str().unwrap().starts_with("1 file(s)"));
}

#[test]
fn status_table_renders_indicators() {
    let dir = TempDir::new().unwrap();
    launchpad_cmd(dir.path())
        .args(["status", "-d", "apps.demo.example.com"])
        .assert()
        .success()
        .stdout(contains("Indicators:"))
        .stdout(contains("next apply: no previous apply recorded"));
}
