// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The executor contract and the shared subprocess plumbing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;

use crate::container::ContainerExecutor;
use crate::local::LocalExecutor;
use crate::path_map::PathMap;

/// Synthetic return code for a timed-out subprocess; callers treat it as
/// SIGTERM.
pub const TIMEOUT_RETURNCODE: i32 = -15;

/// Process-wide mutex serializing executions marked `exclusive`.
///
/// Clones share one underlying lock; the daemon hands the same handle to
/// the runtime and the git wrapper.
#[derive(Clone, Default)]
pub struct ExecLock(Arc<Mutex<()>>);

impl ExecLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.0.lock().await
    }
}

/// One subprocess invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecSpec {
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Option<HashMap<String, String>>,
    pub timeout: Option<Duration>,
    pub exclusive: bool,
}

/// Captured result of a finished (or killed) subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutcome {
    /// Whether this is the synthetic timeout outcome.
    pub fn timed_out(&self) -> bool {
        self.returncode == TIMEOUT_RETURNCODE
    }
}

/// Errors from the execution runtime.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("args is required")]
    EmptyArgs,

    #[error("Failed to spawn {command}: {source}")]
    Spawn { command: String, source: std::io::Error },

    #[error("{0}")]
    Capability(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Subprocess execution seam.
///
/// Implementations share the contract: merged environment, captured
/// output, per-call timeout surfacing as a −15 outcome, and the exclusive
/// mutex taken around the whole invocation when requested.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, spec: ExecSpec) -> Result<ExecOutcome, ExecError>;

    /// Fail fast when required external tools are missing.
    async fn check_capabilities(&self) -> Result<(), ExecError>;
}

/// Build the runtime from environment configuration.
///
/// `HARNESS_CONTAINER_ID` selects container mode; `HARNESS_HOST_ROOT` and
/// `HARNESS_CONTAINER_ROOT` (both required) select volume path mapping,
/// otherwise paths pass through unchanged.
pub fn runtime_from_env(lock: ExecLock) -> Arc<dyn Executor> {
    match std::env::var("HARNESS_CONTAINER_ID") {
        Ok(container_id) if !container_id.is_empty() => {
            let host_root = std::env::var("HARNESS_HOST_ROOT").unwrap_or_default();
            let container_root = std::env::var("HARNESS_CONTAINER_ROOT").unwrap_or_default();
            let path_map = if !host_root.is_empty() && !container_root.is_empty() {
                PathMap::volume(&host_root, &container_root)
            } else {
                PathMap::Identity
            };
            Arc::new(ContainerExecutor::new(container_id, path_map, lock))
        }
        _ => Arc::new(LocalExecutor::new(lock)),
    }
}

/// Spawn, capture, and reap one subprocess.
///
/// Output is read on background tasks so that a timeout still returns
/// whatever partial output the child produced before the kill.
pub(crate) async fn run_command(
    args: &[String],
    cwd: Option<&Path>,
    env: Option<&HashMap<String, String>>,
    timeout: Option<Duration>,
) -> Result<ExecOutcome, ExecError> {
    let (program, rest) = args.split_first().ok_or(ExecError::EmptyArgs)?;

    let mut command = tokio::process::Command::new(program);
    command.args(rest);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }
    if let Some(env) = env {
        // Inherited process environment merged with the supplied one;
        // supplied values win.
        command.envs(env);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    command.kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|source| ExecError::Spawn { command: program.clone(), source })?;

    let stdout_task = tokio::spawn(drain(child.stdout.take()));
    let stderr_task = tokio::spawn(drain(child.stderr.take()));

    let status = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => Some(status?),
            Err(_) => {
                // Deadline passed: kill and reap, then report −15.
                let _ = child.start_kill();
                let _ = child.wait().await;
                None
            }
        },
        None => Some(child.wait().await?),
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();

    let returncode = match status {
        Some(status) => exit_code(status),
        None => TIMEOUT_RETURNCODE,
    };
    tracing::debug!(command = %program, returncode, "subprocess finished");
    Ok(ExecOutcome { returncode, stdout, stderr })
}

async fn drain<R>(reader: Option<R>) -> String
where
    R: AsyncReadExt + Unpin + Send + 'static,
{
    let Some(mut reader) = reader else { return String::new() };
    let mut buf = Vec::new();
    let _ = reader.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

/// Negative-signal convention: a signaled exit reports `-signo`.
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match status.code() {
        Some(code) => code,
        None => status.signal().map_or(-1, |signo| -signo),
    }
}
