//! Tests for bulk commands: `load-all`, `enable-all`, `disable-all`, `unload-all`.

use predicates::prelude::*;

use super::Workspace;

/// Test that load-all loads dependencies before dependents.
#[test]
fn test_load_all_in_dependency_order() {
    let ws = Workspace::new();
    ws.asset("A", &["Z"]).asset("Z", &[]);

    ws.cmd()
        .arg("load-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 2 plugin(s)"));

    ws.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?s)Z\s.*\nA\s").unwrap());
}

/// Test that load-all reports only what it could load.
#[test]
fn test_load_all_skips_broken_assets() {
    let ws = Workspace::new();
    ws.asset("good", &[]).asset("orphan", &["absent"]);
    std::fs::write(ws.root().join("broken.json"), "{ not json").unwrap();

    ws.cmd()
        .arg("load-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 1 plugin(s)"));
}

/// Test the full bulk cycle across invocations.
#[test]
fn test_enable_disable_unload_all() {
    let ws = Workspace::new();
    ws.asset("core", &[]).asset("web", &["core"]);

    ws.cmd().arg("load-all").assert().success();
    ws.cmd()
        .arg("enable-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("Enabled 2 plugin(s)"));

    ws.cmd()
        .args(["stats", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""total":2"#))
        .stdout(predicate::str::contains(r#""enabled":2"#));

    ws.cmd().arg("disable-all").assert().success();
    ws.cmd()
        .args(["stats", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""enabled":0"#))
        .stdout(predicate::str::contains(r#""disabled":2"#));

    ws.cmd()
        .arg("unload-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("Unloaded all plugins"));

    ws.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No plugins loaded"));

    assert_eq!(ws.hooks("web").last().map(String::as_str), Some("on_unload"));
    assert_eq!(ws.hooks("core").last().map(String::as_str), Some("on_unload"));
}

/// Test that the component kind uses the same machinery.
#[test]
fn test_component_kind() {
    let ws = Workspace::new();
    ws.asset("renderer", &[]);

    ws.cmd()
        .args(["--kind", "component", "load-all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 1 component(s)"));

    ws.cmd()
        .args(["--kind", "component", "list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""kind": "component""#));
}

/// Test that each kind defaults to its own root and state file.
#[test]
fn test_kind_selects_default_root() {
    let ws = Workspace::new();
    ws.asset("x", &[]);

    let mut cmd = assert_cmd::Command::cargo_bin("plugdeck").unwrap();
    cmd.current_dir(ws.tmp.path())
        .env_remove("PLUGDECK_ROOT")
        .env_remove("PLUGDECK_KIND")
        .env_remove("PLUGDECK_STATE_FILE")
        .args(["--kind", "component", "load-all"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Loaded 0 component(s)"));

    let components = ws.tmp.path().join("components");
    assert!(components.is_dir());
    assert!(components.join(".plugdeck-state.json").exists());
    assert!(!ws.root().join(".plugdeck-state.json").exists());
}
