// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;
use serial_test::serial;

use crate::specs::support::TestDaemon;

fn git(dir: &std::path::Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

#[tokio::test]
#[serial]
async fn concurrent_git_commands_never_hit_the_index_lock() {
    let dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init", "-q"]);
    git(dir.path(), &["config", "user.email", "t@example.com"]);
    git(dir.path(), &["config", "user.name", "Test"]);
    std::fs::write(dir.path().join("seed.txt"), "seed").unwrap();
    git(dir.path(), &["add", "-A"]);
    git(dir.path(), &["commit", "-q", "-m", "seed"]);

    let daemon = std::sync::Arc::new(TestDaemon::start(dir.path()).await);

    // Ten index-mutating commands race; the exec mutex serializes them.
    let mut handles = Vec::new();
    for i in 0..10 {
        let daemon = std::sync::Arc::clone(&daemon);
        let file = dir.path().join(format!("file-{i}.txt"));
        handles.push(tokio::spawn(async move {
            std::fs::write(&file, "content").unwrap();
            daemon
                .request(json!({"command": "git", "args": ["add", "-A"]}))
                .await
        }));
    }

    for handle in handles {
        let response = handle.await.unwrap();
        assert_eq!(response["status"], "ok");
        assert_eq!(response["data"]["returncode"], 0, "{response}");
        let stderr = response["data"]["stderr"].as_str().unwrap();
        assert!(!stderr.contains("index.lock"), "{stderr}");
    }

    let daemon = std::sync::Arc::into_inner(daemon).unwrap();
    daemon.stop().await;
}

#[tokio::test]
#[serial]
async fn git_handler_refuses_forbidden_options() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = TestDaemon::start(dir.path()).await;

    let response = daemon
        .request(json!({"command": "git", "args": ["--upload-pack=evil", "status"]}))
        .await;
    assert_eq!(response["status"], "error");
    assert!(response["message"].as_str().unwrap().contains("Forbidden git option"));

    daemon.stop().await;
}
