//! End-to-end tests for the waymark binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Group 1: 1 -> 2 -> 3 (3 days, 5 days, 1 day), with dates not yet reflowed.
/// Group 2: item 10 alone.
const PROJECT: &str = r#"{
  "items": [
    { "id": 1, "groupId": 1, "startDate": "2025-01-01", "endDate": "2025-01-03", "duration": 3 },
    { "id": 2, "groupId": 1, "startDate": "2025-01-01", "endDate": "2025-01-05", "duration": 5 },
    { "id": 3, "groupId": 1, "startDate": "2025-01-01", "endDate": "2025-01-01", "duration": 1 },
    { "id": 10, "groupId": 2, "startDate": "2025-02-01", "endDate": "2025-02-02", "duration": 2 }
  ],
  "edges": [
    { "predecessor": 1, "successor": 2 },
    { "predecessor": 2, "successor": 3 }
  ],
  "overlays": [
    { "itemId": 1, "teamId": 7, "duration": 6 }
  ]
}"#;

fn waymark() -> Command {
    let mut cmd = assert_cmd::cargo_bin_cmd!("waymark");
    cmd.env_remove("RUST_LOG")
        .env_remove("WAYMARK_LOG")
        .env_remove("WAYMARK_LOG_FORMAT");
    cmd
}

fn project() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("project.json");
    std::fs::write(&path, PROJECT).unwrap();
    (dir, path)
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

fn stored_start(path: &Path, id: u64) -> String {
    let snapshot: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    snapshot["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|item| item["id"] == id)
        .unwrap()["startDate"]
        .as_str()
        .unwrap()
        .to_string()
}

#[test]
fn test_reflow_prints_only_changed_items() {
    let (_dir, path) = project();
    let updates = stdout_json(waymark().arg("reflow").arg(&path));

    let updates = updates.as_array().unwrap();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0]["id"], 2);
    assert_eq!(updates[0]["startDate"], "2025-01-04");
    assert_eq!(updates[0]["endDate"], "2025-01-08");
    assert_eq!(updates[1]["id"], 3);
    assert_eq!(updates[1]["startDate"], "2025-01-09");
}

#[test]
fn test_reflow_without_write_leaves_file_alone() {
    let (_dir, path) = project();
    waymark().arg("reflow").arg(&path).assert().success();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), PROJECT);
}

#[test]
fn test_reflow_with_edits_and_write() {
    let (_dir, path) = project();
    waymark()
        .args(["reflow", "--set-duration", "1=5", "--write"])
        .arg(&path)
        .assert()
        .success();

    assert_eq!(stored_start(&path, 2), "2025-01-06");
    assert_eq!(stored_start(&path, 3), "2025-01-11");

    // Settled snapshot reflows to nothing.
    waymark()
        .arg("reflow")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[]"));
}

#[test]
fn test_reflow_unknown_item_fails() {
    let (_dir, path) = project();
    waymark()
        .args(["reflow", "--set-start", "99=2025-03-01"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("item#99"));
}

#[test]
fn test_check_edge_allows_forward_edge() {
    let (_dir, path) = project();
    let check = stdout_json(waymark().arg("check-edge").arg(&path).args(["1", "3"]));
    assert_eq!(check["allowed"], true);
    assert!(check.get("reason").is_none());
}

#[test]
fn test_check_edge_rejects_cycle() {
    let (_dir, path) = project();
    let check = stdout_json(waymark().arg("check-edge").arg(&path).args(["3", "1"]));

    assert_eq!(check["allowed"], false);
    assert!(check["reason"].as_str().unwrap().contains("circular"));
}

#[test]
fn test_check_edge_rejects_cross_group() {
    let (_dir, path) = project();
    let check = stdout_json(waymark().arg("check-edge").arg(&path).args(["1", "10"]));

    assert_eq!(check["allowed"], false);
    assert!(check["reason"].as_str().unwrap().contains("item#10"));
    assert!(check["reason"].as_str().unwrap().contains("group#1"));
}

#[test]
fn test_check_edge_unknown_item_fails() {
    let (_dir, path) = project();
    waymark()
        .arg("check-edge")
        .arg(&path)
        .args(["1", "99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("item#99"));
}

#[test]
fn test_overlays_expand_parent() {
    let (_dir, path) = project();
    let reports = stdout_json(waymark().arg("overlays").arg(&path));

    let project = &reports.as_array().unwrap()[0];
    assert_eq!(project["groupId"], 1);
    assert_eq!(project["expansions"][0]["itemId"], 1);
    assert_eq!(project["expansions"][0]["duration"], 6);
    assert_eq!(project["overlayDates"][0]["endDate"], "2025-01-06");
}

#[test]
fn test_team_schedule() {
    let (_dir, path) = project();
    let tracks = stdout_json(waymark().arg("overlays").arg(&path).args(["--team", "7"]));

    let tracks = tracks.as_array().unwrap();
    assert_eq!(tracks.len(), 4);
    assert_eq!(tracks[1]["itemId"], 2);
    assert_eq!(tracks[1]["startDate"], "2025-01-07");
}

#[test]
fn test_team_schedule_rejects_write() {
    let (_dir, path) = project();
    waymark()
        .arg("overlays")
        .arg(&path)
        .args(["--team", "7", "--write"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), PROJECT);
}

#[test]
fn test_move_bridges_and_writes() {
    let (_dir, path) = project();
    let outcome = stdout_json(
        waymark()
            .arg("move")
            .arg(&path)
            .args(["2", "--to", "2", "--write"]),
    );

    assert_eq!(outcome["moved"]["groupId"], 2);
    assert_eq!(outcome["bridgedEdges"][0]["predecessor"], 1);
    assert_eq!(outcome["bridgedEdges"][0]["successor"], 3);
    assert_eq!(stored_start(&path, 3), "2025-01-04");
}

#[test]
fn test_move_to_same_group_fails() {
    let (_dir, path) = project();
    waymark()
        .arg("move")
        .arg(&path)
        .args(["2", "--to", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already in"));
}

#[test]
fn test_reorder_chain() {
    let (_dir, path) = project();
    let outcome = stdout_json(waymark().arg("reorder").arg(&path).args(["1", "3", "1", "2"]));

    assert_eq!(outcome["rootAnchor"]["id"], 3);
    assert_eq!(outcome["rootAnchor"]["startDate"], "2025-01-01");
    assert_eq!(outcome["newEdges"].as_array().unwrap().len(), 2);
}

#[test]
fn test_reorder_incomplete_order_fails() {
    let (_dir, path) = project();
    waymark()
        .arg("reorder")
        .arg(&path)
        .args(["1", "3", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("2 of 3"));
}

#[test]
fn test_order_by_group() {
    let (_dir, path) = project();
    let orders = stdout_json(waymark().arg("order").arg(&path));

    assert_eq!(orders[0]["groupId"], 1);
    assert_eq!(orders[0]["items"], serde_json::json!([1, 2, 3]));
    assert_eq!(orders[1]["items"], serde_json::json!([10]));

    let only = stdout_json(waymark().arg("order").arg(&path).args(["--group", "2"]));
    assert_eq!(only.as_array().unwrap().len(), 1);
}

#[test]
fn test_missing_snapshot_fails() {
    waymark()
        .args(["order", "/nonexistent/waymark.json"])
        .assert()
        .failure();
}

#[test]
fn test_logs_stay_off_stdout() {
    let (_dir, path) = project();
    let orders = stdout_json(
        waymark()
            .args(["--log-level", "debug", "--log-format", "json", "order"])
            .arg(&path),
    );
    assert!(orders.is_array());
}
