// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use fs2::FileExt;
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use harness_exec::{runtime_from_env, ExecLock, GitRunner};
use harness_storage::{ProjectRegistry, TrajectoryLog, WorkflowStore, TRAJECTORY_FILE_NAME};

use crate::listener::ListenCtx;
use crate::telemetry::TelemetryEmitter;

use super::{Config, Daemon, LifecycleError};

/// Start the daemon: acquire the single-instance lock, verify
/// capabilities, register the workspace, preload state, and bind the
/// socket.
pub async fn startup(config: Config) -> Result<Daemon, LifecycleError> {
    // Lock directory must exist before anything else.
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Acquire the lock FIRST to prevent startup races. OpenOptions
    // without truncate so a losing contender does not wipe the winner's
    // PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::AlreadyRunning)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    match startup_inner(&config).await {
        Ok((ctx, listener)) => Ok(Daemon::new(config, lock_file, ctx, listener)),
        Err(e) => {
            // We hold the lock, so these files are ours to remove.
            cleanup_on_failure(&config);
            Err(e)
        }
    }
}

async fn startup_inner(
    config: &Config,
) -> Result<(Arc<ListenCtx>, UnixListener), LifecycleError> {
    // Capability check is eager and fatal: a daemon that cannot run git
    // is useless to every client.
    let exec_lock = ExecLock::new();
    let executor = runtime_from_env(exec_lock.clone());
    executor
        .check_capabilities()
        .await
        .map_err(|e| LifecycleError::Capability(e.to_string()))?;

    let registry = ProjectRegistry::from_env()?;
    registry.register(&config.workspace_root)?;

    let store = WorkflowStore::new(&config.workspace_root);
    match store.load()? {
        Some(state) => info!("recovered workflow state: {} tasks", state.tasks.len()),
        None => info!("no workflow state on disk, starting empty"),
    }

    let trajectory = TrajectoryLog::new(
        config.workspace_root.join(".claude").join(TRAJECTORY_FILE_NAME),
    );

    let telemetry = crate::env::acp_port().map(TelemetryEmitter::connect_localhost);
    if telemetry.is_some() {
        info!("telemetry emitter enabled");
    }

    // Bind LAST, after all validation passes; remove a stale socket from
    // a previous unclean exit.
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    // Filesystem permissions are the only access control on the socket.
    std::fs::set_permissions(
        &config.socket_path,
        std::fs::Permissions::from_mode(0o600),
    )?;

    let git = GitRunner::new(Arc::clone(&executor), exec_lock);

    let ctx = Arc::new(ListenCtx {
        store,
        trajectory,
        telemetry,
        executor,
        git,
        workspace_root: config.workspace_root.clone(),
        shutdown: Arc::new(Notify::new()),
    });

    info!(socket = %config.socket_path.display(), "daemon started");
    Ok((ctx, listener))
}

/// Remove startup artifacts after a failed start. Never called when the
/// flock was lost: those files belong to the running daemon.
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        if let Err(e) = std::fs::remove_file(&config.socket_path) {
            warn!("failed to remove socket after failed startup: {e}");
        }
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
