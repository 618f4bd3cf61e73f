//! Tests for single-asset commands: `load`, `enable`, `disable`, `unload`, `reload`.

use predicates::prelude::*;

use super::Workspace;

/// Test load then enable, with state carried between invocations.
#[test]
fn test_load_and_enable_persist_between_runs() {
    let ws = Workspace::new();
    ws.asset("metrics", &[]);

    ws.cmd()
        .arg("load")
        .arg("metrics")
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded metrics"));

    ws.cmd()
        .arg("enable")
        .arg("metrics")
        .assert()
        .success()
        .stdout(predicate::str::contains("Enabled metrics"));

    ws.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("metrics"))
        .stdout(predicate::str::contains("ENABLED"))
        .stdout(predicate::str::contains("0.3.1"));

    let state = std::fs::read_to_string(ws.root().join(".plugdeck-state.json")).unwrap();
    assert!(state.contains("\"enabled\""));
    assert!(state.contains("metrics"));
}

/// Test that hooks run in lifecycle order across invocations.
#[test]
fn test_hooks_are_recorded() {
    let ws = Workspace::new();
    ws.asset("metrics", &[]);

    ws.cmd().arg("load").arg("metrics").assert().success();
    ws.cmd().arg("enable").arg("metrics").assert().success();
    ws.cmd().arg("unload").arg("metrics").assert().success();

    // every run after the first restores the asset before acting
    assert_eq!(
        ws.hooks("metrics"),
        vec![
            "on_load",
            "on_load",
            "on_enable",
            "on_load",
            "on_enable",
            "on_disable",
            "on_unload",
        ]
    );
}

/// Test that a missing hard dependency fails the load.
#[test]
fn test_load_with_missing_dependency_fails() {
    let ws = Workspace::new();
    ws.asset("api", &["db"]).asset("db", &[]);

    ws.cmd()
        .arg("load")
        .arg("api")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsatisfied dependencies: db"));

    ws.cmd().arg("load").arg("db").assert().success();
    ws.cmd().arg("load").arg("api").assert().success();
}

/// Test loading an asset that does not exist.
#[test]
fn test_load_unknown_asset_fails() {
    let ws = Workspace::new();

    ws.cmd()
        .arg("load")
        .arg("ghost")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost"));
}

/// Test that unloading an asset that is not loaded fails.
#[test]
fn test_unload_not_loaded_fails() {
    let ws = Workspace::new();
    ws.asset("metrics", &[]);

    ws.cmd()
        .arg("unload")
        .arg("metrics")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not loaded"));
}

/// Test that disable leaves the asset loaded.
#[test]
fn test_disable_keeps_asset_loaded() {
    let ws = Workspace::new();
    ws.asset("metrics", &[]);

    ws.cmd().arg("load").arg("metrics").assert().success();
    ws.cmd().arg("enable").arg("metrics").assert().success();
    ws.cmd().arg("disable").arg("metrics").assert().success();

    ws.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"metrics\s+LOADED\s").unwrap())
        .stdout(predicate::str::contains("ENABLED").not());
}

/// Test reload of an enabled asset.
#[test]
fn test_reload_keeps_asset_enabled() {
    let ws = Workspace::new();
    ws.asset("metrics", &[]);

    ws.cmd().arg("load").arg("metrics").assert().success();
    ws.cmd().arg("enable").arg("metrics").assert().success();
    ws.cmd()
        .arg("reload")
        .arg("metrics")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reloaded metrics"));

    let hooks = ws.hooks("metrics");
    assert_eq!(
        hooks[hooks.len() - 5..],
        ["on_disable", "on_unload", "on_load", "on_reload", "on_enable"]
    );

    ws.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("ENABLED"));
}
