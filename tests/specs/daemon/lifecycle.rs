// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;
use serial_test::serial;

use crate::specs::support::{request_on, wait_gone, TestDaemon};

#[tokio::test]
#[serial]
async fn ping_answers_with_the_daemon_pid() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(dir.path()).await;

    let response = daemon.request(json!({"command": "ping"})).await;
    assert_eq!(response["status"], "ok");
    assert_eq!(response["data"]["running"], true);
    assert_eq!(response["data"]["pid"], std::process::id());

    daemon.stop().await;
}

#[tokio::test]
#[serial]
async fn shutdown_command_acks_then_removes_socket_and_lockfile() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(dir.path()).await;
    let socket = daemon.config.socket_path.clone();
    let lock = daemon.config.lock_path.clone();

    let response = request_on(&socket, json!({"command": "shutdown"})).await;
    assert_eq!(response["status"], "ok");
    assert_eq!(response["data"]["shutdown"], true);

    // stop() joins the serve task; the wire command already triggered
    // the shutdown, the extra notification is a no-op.
    daemon.stop().await;
    wait_gone(&socket).await;
    wait_gone(&lock).await;
}

#[tokio::test]
#[serial]
async fn second_daemon_against_the_same_socket_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(dir.path()).await;

    let err = harness_daemon::startup(daemon.config.clone()).await.unwrap_err();
    assert_eq!(err.to_string(), "Another daemon is already running");

    // The loser must not have damaged the winner: it still answers.
    let response = daemon.request(json!({"command": "ping"})).await;
    assert_eq!(response["status"], "ok");

    daemon.stop().await;
}

#[tokio::test]
#[serial]
async fn daemon_can_restart_on_the_same_socket_after_clean_exit() {
    let dir = tempfile::tempdir().unwrap();

    let first = TestDaemon::start(dir.path()).await;
    first.stop().await;

    let second = TestDaemon::start(dir.path()).await;
    let response = second.request(json!({"command": "ping"})).await;
    assert_eq!(response["status"], "ok");
    second.stop().await;
}

#[tokio::test]
#[serial]
async fn unknown_command_is_a_single_error_response() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(dir.path()).await;

    let response = daemon.request(json!({"command": "frobnicate"})).await;
    assert_eq!(response["status"], "error");
    assert!(response["message"].as_str().unwrap().contains("Invalid request"));

    daemon.stop().await;
}
