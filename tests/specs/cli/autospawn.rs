// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The client spawns the daemon on demand (detached process group, null
//! stdio) and finds persisted state again after the daemon restarts.

use serde_json::json;
use serial_test::serial;
use std::process::Output;

use crate::specs::support::{request_on, target_bin, wait_gone, PLAN};

struct Env {
    dir: tempfile::TempDir,
}

impl Env {
    fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    fn socket(&self) -> std::path::PathBuf {
        self.dir.path().join("harness.sock")
    }

    fn harness(&self, args: &[&str]) -> Output {
        let mut cmd = assert_cmd::Command::new(target_bin("harness"));
        cmd.args(args)
            .env("HARNESS_SOCKET", self.socket())
            .env("HARNESS_WORKSPACE", self.dir.path())
            .env("HARNESS_REGISTRY_FILE", self.dir.path().join("registry.json"))
            .env("HARNESS_WORKER_ID_FILE", self.dir.path().join("worker.id"))
            .timeout(std::time::Duration::from_secs(30));
        cmd.output().unwrap()
    }

    fn harness_ok(&self, args: &[&str]) -> String {
        let output = self.harness(args);
        assert!(
            output.status.success(),
            "harness {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    async fn shutdown_daemon(&self) {
        let response = request_on(&self.socket(), json!({"command": "shutdown"})).await;
        assert_eq!(response["status"], "ok");
        wait_gone(&self.socket()).await;
    }
}

#[tokio::test]
#[serial]
async fn ping_spawns_the_daemon_within_the_deadline() {
    let env = Env::new();
    assert!(!env.socket().exists());

    let stdout = env.harness_ok(&["ping"]);
    assert!(stdout.contains("\"running\": true"), "{stdout}");
    assert!(env.socket().exists(), "daemon created its socket");

    env.shutdown_daemon().await;
}

#[tokio::test]
#[serial]
async fn respawned_daemon_recovers_persisted_state() {
    let env = Env::new();

    // First daemon: import a plan and make progress.
    let plan_file = env.dir.path().join("plan.md");
    std::fs::write(&plan_file, PLAN).unwrap();
    env.harness_ok(&["plan", "import", plan_file.to_str().unwrap()]);

    let claimed = env.harness_ok(&["claim"]);
    assert!(claimed.contains("\"id\": \"a\""), "{claimed}");
    env.harness_ok(&["complete", "a"]);
    env.shutdown_daemon().await;

    // The next command respawns the daemon; the progress survived.
    let state = env.harness_ok(&["state"]);
    assert!(state.contains("\"completed\""), "{state}");
    assert!(env.socket().exists(), "daemon respawned");

    env.shutdown_daemon().await;
}

#[tokio::test]
#[serial]
async fn error_responses_exit_nonzero() {
    let env = Env::new();

    // Freshly spawned daemon, no plan imported: completing anything is a
    // state error surfaced as a non-zero exit.
    let output = env.harness(&["complete", "ghost"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No workflow state"), "{stderr}");

    env.shutdown_daemon().await;
}
