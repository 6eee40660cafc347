// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::{json, Value};
use serial_test::serial;

use crate::specs::support::{TestDaemon, PLAN};

#[tokio::test]
#[serial]
async fn linear_dag_progresses_through_two_workers() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(dir.path()).await;

    let imported = daemon
        .request(json!({"command": "plan_import", "content": PLAN}))
        .await;
    assert_eq!(imported["status"], "ok");
    assert_eq!(imported["data"]["task_count"], 2);

    let claim = daemon
        .request(json!({"command": "task_claim", "worker_id": "w1"}))
        .await;
    assert_eq!(claim["data"]["task"]["id"], "a");

    let blocked = daemon
        .request(json!({"command": "task_claim", "worker_id": "w2"}))
        .await;
    assert_eq!(blocked["data"]["task"], Value::Null);

    let done = daemon
        .request(json!({"command": "task_complete", "task_id": "a", "worker_id": "w1"}))
        .await;
    assert_eq!(done["status"], "ok");

    let next = daemon
        .request(json!({"command": "task_claim", "worker_id": "w2"}))
        .await;
    assert_eq!(next["data"]["task"]["id"], "b");

    daemon
        .request(json!({"command": "task_complete", "task_id": "b", "worker_id": "w2"}))
        .await;

    let state = daemon.request(json!({"command": "get_state"})).await;
    let tasks = state["data"]["state"]["tasks"].as_object().unwrap();
    assert!(tasks.values().all(|t| t["status"] == "completed"));

    daemon.stop().await;
}

#[tokio::test]
#[serial]
async fn status_reflects_claims_and_trajectory() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(dir.path()).await;

    daemon.request(json!({"command": "plan_import", "content": PLAN})).await;
    daemon.request(json!({"command": "task_claim", "worker_id": "w1"})).await;

    let status = daemon.request(json!({"command": "status"})).await;
    assert_eq!(status["data"]["active"], true);
    assert_eq!(status["data"]["summary"]["total"], 2);
    assert_eq!(status["data"]["summary"]["running"], 1);
    assert_eq!(status["data"]["active_workers"], json!(["w1"]));

    let events = status["data"]["events"].as_array().unwrap();
    assert!(events.iter().any(|e| e["event_type"] == "plan_import"));
    assert!(events.iter().any(|e| e["event_type"] == "task_claim"));

    daemon.stop().await;
}

#[tokio::test]
#[serial]
async fn cyclic_plan_is_rejected_and_prior_state_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(dir.path()).await;

    // No plan yet: a cyclic import fails and state stays null.
    let cyclic = r#"
**Goal:** broken

| Task Group | Tasks |
|------------|-------|
| Group 1    | a |
| Group 2    | a, b |

### Task a: first

### Task b: second
"#;
    let rejected = daemon
        .request(json!({"command": "plan_import", "content": cyclic}))
        .await;
    assert_eq!(rejected["status"], "error");
    assert!(rejected["message"].as_str().unwrap().contains("Cycle detected"));

    let state = daemon.request(json!({"command": "get_state"})).await;
    assert_eq!(state["data"]["state"], Value::Null);

    daemon.stop().await;
}

#[tokio::test]
#[serial]
async fn state_survives_a_daemon_restart() {
    let dir = tempfile::tempdir().unwrap();

    let first = TestDaemon::start(dir.path()).await;
    first.request(json!({"command": "plan_import", "content": PLAN})).await;
    first.request(json!({"command": "task_claim", "worker_id": "w1"})).await;
    first
        .request(json!({"command": "task_complete", "task_id": "a", "worker_id": "w1"}))
        .await;
    first.stop().await;

    let second = TestDaemon::start(dir.path()).await;
    let state = second.request(json!({"command": "get_state"})).await;
    assert_eq!(state["data"]["state"]["tasks"]["a"]["status"], "completed");
    assert_eq!(state["data"]["state"]["tasks"]["b"]["status"], "pending");

    // The recovered DAG keeps working: b is claimable now.
    let claim = second
        .request(json!({"command": "task_claim", "worker_id": "w2"}))
        .await;
    assert_eq!(claim["data"]["task"]["id"], "b");

    second.stop().await;
}

#[tokio::test]
#[serial]
async fn plan_reset_clears_persisted_state() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(dir.path()).await;

    daemon.request(json!({"command": "plan_import", "content": PLAN})).await;
    let reset = daemon.request(json!({"command": "plan_reset"})).await;
    assert_eq!(reset["data"]["message"], "Workflow state cleared");

    let state = daemon.request(json!({"command": "get_state"})).await;
    assert_eq!(state["data"]["state"], Value::Null);
    assert!(!dir.path().join(".claude/dev-workflow-state.json").exists());

    daemon.stop().await;
}
