// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use std::path::Path;

fn registry_override(dir: &Path) -> (&'static str, Option<String>) {
    let key = "HARNESS_REGISTRY_FILE";
    let prior = std::env::var(key).ok();
    std::env::set_var(key, dir.join("registry.json"));
    (key, prior)
}

fn restore((key, prior): (&'static str, Option<String>)) {
    match prior {
        Some(value) => std::env::set_var(key, value),
        None => std::env::remove_var(key),
    }
}

#[test]
fn lock_path_appends_to_the_socket_name() {
    let config =
        Config::new(PathBuf::from("/work"), PathBuf::from("/run/harness-alice.sock"));
    assert_eq!(config.lock_path, PathBuf::from("/run/harness-alice.sock.lock"));
}

#[tokio::test]
#[serial]
async fn run_cleans_up_socket_and_lockfile_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let guard = registry_override(dir.path());

    let config = Config::new(dir.path().to_path_buf(), dir.path().join("d.sock"));
    let daemon = startup(config.clone()).await.unwrap();
    let shutdown = daemon.shutdown_handle();
    assert!(config.socket_path.exists());
    assert!(config.lock_path.exists());

    let serve = tokio::spawn(daemon.run());
    shutdown.notify_one();
    serve.await.unwrap().unwrap();

    assert!(!config.socket_path.exists(), "socket removed on shutdown");
    assert!(!config.lock_path.exists(), "lockfile removed on shutdown");

    restore(guard);
}

#[tokio::test]
#[serial]
async fn daemon_answers_over_the_real_socket() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let dir = tempfile::tempdir().unwrap();
    let guard = registry_override(dir.path());

    let config = Config::new(dir.path().to_path_buf(), dir.path().join("d.sock"));
    let daemon = startup(config.clone()).await.unwrap();
    let shutdown = daemon.shutdown_handle();
    let serve = tokio::spawn(daemon.run());

    let mut stream = tokio::net::UnixStream::connect(&config.socket_path).await.unwrap();
    stream.write_all(b"{\"command\": \"ping\"}\n").await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();

    let response: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    assert_eq!(response["status"], "ok");
    assert_eq!(response["data"]["running"], true);

    shutdown.notify_one();
    serve.await.unwrap().unwrap();
    restore(guard);
}
