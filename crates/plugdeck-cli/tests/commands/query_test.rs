//! Tests for read-only commands: `discover`, `list`, `stats`.

use predicates::prelude::*;

use super::Workspace;

/// Test discovery of file and directory units.
#[test]
fn test_discover_lists_units() {
    let ws = Workspace::new();
    ws.asset("metrics", &[]);
    let web = ws.root().join("web");
    std::fs::create_dir(&web).unwrap();
    std::fs::write(web.join("asset.json"), r#"{"version": "1.0.0"}"#).unwrap();
    std::fs::create_dir(ws.root().join("_disabled")).unwrap();

    ws.cmd()
        .arg("discover")
        .assert()
        .success()
        .stdout(predicate::str::contains("metrics"))
        .stdout(predicate::str::contains("web"))
        .stdout(predicate::str::contains("asset.json"))
        .stdout(predicate::str::contains("_disabled").not())
        .stdout(predicate::str::contains("Total: 2 asset(s)"));
}

/// Test discovery on an empty root.
#[test]
fn test_discover_empty_root() {
    let ws = Workspace::new();

    ws.cmd()
        .arg("discover")
        .assert()
        .success()
        .stdout(predicate::str::contains("No assets found"));
}

/// Test that a root directory that does not exist yet is created.
#[test]
fn test_missing_root_is_created() {
    let ws = Workspace::new();
    let root = ws.tmp.path().join("fresh");

    let mut cmd = assert_cmd::Command::cargo_bin("plugdeck").unwrap();
    cmd.current_dir(ws.tmp.path())
        .env_remove("PLUGDECK_ROOT")
        .arg("--root")
        .arg(&root)
        .arg("discover");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No assets found"));

    assert!(root.is_dir());
}

/// Test stats output on a partially enabled set.
#[test]
fn test_stats_counts() {
    let ws = Workspace::new();
    ws.asset("a", &[]).asset("b", &[]).asset("c", &[]);

    ws.cmd().arg("load-all").assert().success();
    ws.cmd().arg("enable").arg("a").assert().success();
    ws.cmd().arg("enable").arg("b").assert().success();

    ws.cmd()
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total:    3"))
        .stdout(predicate::str::contains("Enabled:  2"))
        .stdout(predicate::str::contains("Disabled: 1"));
}

/// Test the JSON listing.
#[test]
fn test_list_json() {
    let ws = Workspace::new();
    ws.asset("metrics", &[]);
    ws.cmd().arg("load").arg("metrics").assert().success();

    let output = ws.cmd().args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());

    let assets: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let first = &assets[0];
    assert_eq!(first["name"], "metrics");
    assert_eq!(first["state"], "loaded");
    assert_eq!(first["descriptor"]["version"], "0.3.1");
}

/// Test reading the root from a config file.
#[test]
fn test_config_file_root() {
    let ws = Workspace::new();
    ws.asset("metrics", &[]);
    let config = ws.tmp.path().join("deck.toml");
    std::fs::write(&config, "root_dir = \"plugins\"\nhook_timeout_secs = 5\n").unwrap();

    let mut cmd = assert_cmd::Command::cargo_bin("plugdeck").unwrap();
    cmd.current_dir(ws.tmp.path())
        .env_remove("PLUGDECK_ROOT")
        .args(["--config", "deck.toml", "load", "metrics"]);
    cmd.assert().success();

    assert!(ws.root().join(".plugdeck-state.json").exists());
}
