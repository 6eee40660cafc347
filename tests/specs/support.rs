// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures: an in-process daemon on a real socket, and a raw
//! line-protocol client.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use harness_daemon::{startup, Config, LifecycleError};

pub const PLAN: &str = r#"
**Goal:** ship the feature

| Task Group | Tasks |
|------------|-------|
| Group 1    | a |
| Group 2    | b |

### Task a: first

### Task b: second
"#;

pub struct TestDaemon {
    pub config: Config,
    shutdown: Arc<Notify>,
    serve: JoinHandle<Result<(), LifecycleError>>,
}

impl TestDaemon {
    /// Start an in-process daemon on a socket inside `dir`, with the
    /// registry redirected into `dir` as well.
    pub async fn start(dir: &Path) -> Self {
        std::env::set_var("HARNESS_REGISTRY_FILE", dir.join("registry.json"));

        let config = Config::new(dir.to_path_buf(), dir.join("harness.sock"));
        let daemon = startup(config.clone()).await.unwrap();
        let shutdown = daemon.shutdown_handle();
        let serve = tokio::spawn(daemon.run());
        Self { config, shutdown, serve }
    }

    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    pub async fn request(&self, request: Value) -> Value {
        request_on(self.socket_path(), request).await
    }

    /// Orderly stop via the shutdown notifier.
    pub async fn stop(self) {
        self.shutdown.notify_one();
        self.serve.await.unwrap().unwrap();
    }
}

/// One raw request line, one response line.
pub async fn request_on(socket: &Path, request: Value) -> Value {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = tokio::net::UnixStream::connect(socket).await.unwrap();
    let mut line = serde_json::to_vec(&request).unwrap();
    line.push(b'\n');
    stream.write_all(&line).await.unwrap();

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    serde_json::from_slice(&buf).unwrap()
}

/// Wait for a path to disappear (daemon teardown is asynchronous when
/// triggered over the wire).
pub async fn wait_gone(path: &Path) {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while path.exists() && std::time::Instant::now() < deadline {
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    assert!(!path.exists(), "{} still present", path.display());
}

/// Path for binaries built alongside the test executable.
pub fn target_bin(name: &str) -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // test binary
    if path.ends_with("deps") {
        path.pop();
    }
    path.join(name)
}
