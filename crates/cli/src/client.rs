// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client: connect, auto-spawn, one request per connection.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tokio::io::BufReader;
use tokio::net::UnixStream;

use harness_wire::{read_response, write_request, Request, Response};

pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    pub fn new() -> Self {
        Self { socket_path: harness_daemon::env::socket_path() }
    }

    pub fn socket_path(&self) -> &std::path::Path {
        &self.socket_path
    }

    /// One request, one response, one connection.
    pub async fn request(&self, request: &Request) -> Result<Response> {
        let stream = UnixStream::connect(&self.socket_path).await.with_context(|| {
            format!("daemon not reachable at {}", self.socket_path.display())
        })?;
        let (read, mut write) = stream.into_split();
        write_request(&mut write, request, io_timeout()).await?;
        let mut reader = BufReader::new(read);
        Ok(read_response(&mut reader, io_timeout()).await?)
    }

    /// Request with auto-spawn: when the daemon is not running, start it
    /// detached and retry once the socket appears.
    pub async fn request_or_spawn(&self, request: &Request) -> Result<Response> {
        if let Ok(response) = self.request(request).await {
            return Ok(response);
        }
        self.spawn_daemon().await?;
        self.request(request).await
    }

    /// Spawn `harnessd` fully detached (new process group, null stdio),
    /// then poll for the socket within the spawn deadline while watching
    /// the child for an immediate crash.
    async fn spawn_daemon(&self) -> Result<()> {
        use std::os::unix::process::CommandExt;
        use std::process::{Command, Stdio};

        let binary = find_daemon_binary();
        let workspace = harness_daemon::env::workspace_root();

        let mut child = Command::new(&binary)
            .arg(&workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()
            .with_context(|| format!("failed to spawn {}", binary.display()))?;

        let limit = spawn_timeout();
        let deadline = Instant::now() + limit;
        loop {
            if let Some(status) = child.try_wait()? {
                bail!("Daemon crashed on startup: {status}");
            }
            if self.socket_path.exists() {
                // The socket exists slightly before accept() runs; give
                // the daemon a beat.
                tokio::time::sleep(Duration::from_millis(50)).await;
                return Ok(());
            }
            if Instant::now() >= deadline {
                bail!("Daemon failed to start (timeout {}s waiting for socket)", limit.as_secs());
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

impl Default for DaemonClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Daemon spawn deadline: `HARNESS_TIMEOUT` seconds, default 5.
fn spawn_timeout() -> Duration {
    std::env::var("HARNESS_TIMEOUT")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(5))
}

fn io_timeout() -> Duration {
    harness_daemon::env::ipc_timeout()
}

/// Prefer the `harnessd` sitting next to this binary; fall back to PATH.
fn find_daemon_binary() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("harnessd");
            if sibling.exists() {
                return sibling;
            }
        }
    }
    PathBuf::from("harnessd")
}
