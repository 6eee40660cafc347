// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::{json, Value};
use tempfile::TempDir;

const PLAN: &str = r#"
**Goal:** ship the feature

| Task Group | Tasks |
|------------|-------|
| Group 1    | a |
| Group 2    | b |

### Task a: first

do the first thing

### Task b: second
"#;

fn ctx() -> (ListenCtx, TempDir) {
    let dir = TempDir::new().unwrap();
    let ctx = test_ctx(dir.path());
    (ctx, dir)
}

fn data(response: Response) -> Value {
    match response {
        Response::Ok { data } => data,
        Response::Error { message } => panic!("unexpected error: {message}"),
    }
}

fn error(response: Response) -> String {
    match response {
        Response::Error { message } => message,
        Response::Ok { data } => panic!("unexpected ok: {data}"),
    }
}

async fn import_plan(ctx: &ListenCtx) {
    let response =
        handle_request(Request::PlanImport { content: PLAN.to_string() }, ctx).await;
    let value = data(response);
    assert_eq!(value["task_count"], 2);
    assert_eq!(value["goal"], "ship the feature");
}

// -- basic dispatch --

#[tokio::test]
async fn ping_reports_pid() {
    let (ctx, _dir) = ctx();
    let value = data(handle_request(Request::Ping, &ctx).await);
    assert_eq!(value["running"], true);
    assert_eq!(value["pid"], std::process::id());
}

#[tokio::test]
async fn get_state_is_null_without_a_plan() {
    let (ctx, _dir) = ctx();
    let value = data(handle_request(Request::GetState, &ctx).await);
    assert_eq!(value["state"], Value::Null);
}

// -- plan import + worker flow --

#[tokio::test]
async fn plan_import_then_claim_and_complete() {
    let (ctx, _dir) = ctx();
    import_plan(&ctx).await;

    let claim = data(
        handle_request(Request::TaskClaim { worker_id: "w1".to_string() }, &ctx).await,
    );
    assert_eq!(claim["task"]["id"], "a");
    assert_eq!(claim["is_retry"], false);

    // b is blocked until a completes.
    let blocked = data(
        handle_request(Request::TaskClaim { worker_id: "w2".to_string() }, &ctx).await,
    );
    assert_eq!(blocked["task"], Value::Null);

    let done = data(
        handle_request(
            Request::TaskComplete { task_id: "a".to_string(), worker_id: "w1".to_string() },
            &ctx,
        )
        .await,
    );
    assert_eq!(done["task_id"], "a");

    let next = data(
        handle_request(Request::TaskClaim { worker_id: "w2".to_string() }, &ctx).await,
    );
    assert_eq!(next["task"]["id"], "b");
}

#[tokio::test]
async fn complete_by_wrong_worker_is_an_ownership_error() {
    let (ctx, _dir) = ctx();
    import_plan(&ctx).await;
    handle_request(Request::TaskClaim { worker_id: "w1".to_string() }, &ctx).await;

    let message = error(
        handle_request(
            Request::TaskComplete { task_id: "a".to_string(), worker_id: "w2".to_string() },
            &ctx,
        )
        .await,
    );
    assert_eq!(message, "Task a not owned by w2 (owned by w1)");
}

#[tokio::test]
async fn cyclic_plan_is_rejected_and_state_survives() {
    let (ctx, _dir) = ctx();
    import_plan(&ctx).await;

    let cyclic = r#"
**Goal:** broken

| Task Group | Tasks |
|------------|-------|
| Group 1    | a |
| Group 2    | a, b |

### Task a: first

### Task b: second
"#;
    let message =
        error(handle_request(Request::PlanImport { content: cyclic.to_string() }, &ctx).await);
    assert!(message.contains("Cycle detected"), "{message}");

    // Prior state still loads.
    let value = data(handle_request(Request::GetState, &ctx).await);
    assert_eq!(value["state"]["tasks"]["a"]["id"], "a");
}

#[tokio::test]
async fn unparseable_plan_gets_a_template_hint() {
    let (ctx, _dir) = ctx();
    let message = error(
        handle_request(Request::PlanImport { content: "not a plan".to_string() }, &ctx).await,
    );
    assert!(message.contains("No valid plan found"), "{message}");
    assert!(message.contains("harness plan template"), "{message}");
}

#[tokio::test]
async fn plan_reset_clears_state() {
    let (ctx, _dir) = ctx();
    import_plan(&ctx).await;

    let value = data(handle_request(Request::PlanReset, &ctx).await);
    assert_eq!(value["message"], "Workflow state cleared");

    let state = data(handle_request(Request::GetState, &ctx).await);
    assert_eq!(state["state"], Value::Null);
}

// -- status --

#[tokio::test]
async fn status_without_state_is_inactive() {
    let (ctx, _dir) = ctx();
    let value = data(handle_request(Request::Status { event_count: 10 }, &ctx).await);
    assert_eq!(value["active"], false);
    assert_eq!(value["summary"]["total"], 0);
    assert_eq!(value["events"], json!([]));
}

#[tokio::test]
async fn status_reports_counts_workers_and_events() {
    let (ctx, _dir) = ctx();
    import_plan(&ctx).await;
    handle_request(Request::TaskClaim { worker_id: "w1".to_string() }, &ctx).await;

    let value = data(handle_request(Request::Status { event_count: 10 }, &ctx).await);
    assert_eq!(value["active"], true);
    assert_eq!(value["summary"]["total"], 2);
    assert_eq!(value["summary"]["running"], 1);
    assert_eq!(value["summary"]["pending"], 1);
    assert_eq!(value["active_workers"], json!(["w1"]));

    // The claim was logged to the trajectory after the state lock
    // released; status reads it back.
    let events = value["events"].as_array().unwrap();
    assert!(events
        .iter()
        .any(|e| e["event_type"] == "task_claim" && e["task_id"] == "a"));
}

// -- update_state --

#[tokio::test]
async fn update_state_rejects_unknown_fields() {
    let (ctx, _dir) = ctx();
    import_plan(&ctx).await;

    let mut updates = serde_json::Map::new();
    updates.insert("pending_deque".to_string(), json!(["a"]));
    let message = error(handle_request(Request::UpdateState { updates }, &ctx).await);
    assert!(message.contains("Unknown update field"), "{message}");
}

#[tokio::test]
async fn update_state_returns_the_new_state() {
    let (ctx, _dir) = ctx();
    import_plan(&ctx).await;

    let mut updates = serde_json::Map::new();
    updates.insert("tasks".to_string(), json!({"solo": {"id": "solo", "description": "d"}}));
    let value = data(handle_request(Request::UpdateState { updates }, &ctx).await);
    assert_eq!(value["tasks"]["solo"]["status"], "pending");
}

// -- git / exec --

#[tokio::test]
async fn git_with_forbidden_option_is_refused() {
    let (ctx, _dir) = ctx();
    let message = error(
        handle_request(
            Request::Git { args: vec!["-c".to_string(), "x=y".to_string()], cwd: None },
            &ctx,
        )
        .await,
    );
    assert!(message.contains("Forbidden git option"), "{message}");
}

#[tokio::test]
async fn exec_captures_output() {
    let (ctx, _dir) = ctx();
    let value = data(
        handle_request(
            Request::Exec {
                args: vec!["echo".to_string(), "hi".to_string()],
                cwd: None,
                env: None,
                timeout: None,
                exclusive: false,
            },
            &ctx,
        )
        .await,
    );
    assert_eq!(value["returncode"], 0);
    assert_eq!(value["stdout"], "hi\n");
    assert!(value.get("signal_name").is_none());
}

#[tokio::test]
async fn exec_without_args_is_an_error() {
    let (ctx, _dir) = ctx();
    let message = error(
        handle_request(
            Request::Exec { args: vec![], cwd: None, env: None, timeout: None, exclusive: false },
            &ctx,
        )
        .await,
    );
    assert_eq!(message, "args is required");
}

#[tokio::test]
async fn exec_timeout_is_a_sigterm_outcome_not_an_error() {
    let (ctx, _dir) = ctx();
    let value = data(
        handle_request(
            Request::Exec {
                args: vec!["sleep".to_string(), "5".to_string()],
                cwd: None,
                env: None,
                timeout: Some(0.1),
                exclusive: false,
            },
            &ctx,
        )
        .await,
    );
    assert_eq!(value["returncode"], -15);
    assert_eq!(value["signal_name"], "SIGTERM");
}

// -- connection framing --

#[tokio::test]
async fn malformed_json_line_yields_one_error_response() {
    let (ctx, _dir) = ctx();
    let (mut client, server) = tokio::io::duplex(1024);
    let (server_read, server_write) = tokio::io::split(server);

    use tokio::io::AsyncWriteExt;
    client.write_all(b"{nope\n").await.unwrap();

    handle_connection(server_read, server_write, &ctx).await.unwrap();

    let mut buf = Vec::new();
    drop_write_half_and_read(&mut client, &mut buf).await;
    let response: Value = serde_json::from_slice(&buf).unwrap();
    assert_eq!(response["status"], "error");
    assert!(response["message"].as_str().unwrap().contains("Invalid request"));
}

#[tokio::test]
async fn empty_line_closes_silently() {
    let (ctx, _dir) = ctx();
    let (mut client, server) = tokio::io::duplex(1024);
    let (server_read, server_write) = tokio::io::split(server);

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    client.write_all(b"\n").await.unwrap();
    handle_connection(server_read, server_write, &ctx).await.unwrap();

    let mut buf = Vec::new();
    client.read_to_end(&mut buf).await.unwrap();
    assert!(buf.is_empty(), "no response bytes: {buf:?}");
}

#[tokio::test]
async fn shutdown_acks_before_notifying() {
    let (ctx, _dir) = ctx();
    let (mut client, server) = tokio::io::duplex(1024);
    let (server_read, server_write) = tokio::io::split(server);

    use tokio::io::AsyncWriteExt;
    client.write_all(b"{\"command\": \"shutdown\"}\n").await.unwrap();
    handle_connection(server_read, server_write, &ctx).await.unwrap();

    let mut buf = Vec::new();
    drop_write_half_and_read(&mut client, &mut buf).await;
    let response: Value = serde_json::from_slice(&buf).unwrap();
    assert_eq!(response["status"], "ok");
    assert_eq!(response["data"]["shutdown"], true);

    // The stored notification is observable after the ack.
    tokio::time::timeout(std::time::Duration::from_millis(100), ctx.shutdown.notified())
        .await
        .unwrap();
}

async fn drop_write_half_and_read(client: &mut tokio::io::DuplexStream, buf: &mut Vec<u8>) {
    use tokio::io::AsyncReadExt;
    // The server half is dropped once handle_connection returns, so
    // read_to_end terminates.
    client.read_to_end(buf).await.unwrap();
}
