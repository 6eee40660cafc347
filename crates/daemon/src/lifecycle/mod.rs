// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, serving, shutdown.

mod startup;
pub use startup::startup;

use std::ffi::OsString;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::UnixListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{info, warn};

use harness_storage::{RegistryError, StoreError};

use crate::listener::{ListenCtx, Listener};

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace root holding the `.claude/` state directory
    pub workspace_root: PathBuf,
    /// Path to the Unix socket
    pub socket_path: PathBuf,
    /// Sibling lockfile carrying the single-instance flock
    pub lock_path: PathBuf,
}

impl Config {
    /// Resolve configuration from the environment.
    pub fn load() -> Self {
        Self::new(crate::env::workspace_root(), crate::env::socket_path())
    }

    pub fn new(workspace_root: PathBuf, socket_path: PathBuf) -> Self {
        // "<socket>.lock", appended rather than substituted so the ".sock"
        // suffix survives.
        let mut lock: OsString = socket_path.clone().into_os_string();
        lock.push(".lock");
        Self { workspace_root, socket_path, lock_path: PathBuf::from(lock) }
    }
}

/// Lifecycle errors. Startup failures are fatal; the process exits
/// non-zero.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Another daemon is already running")]
    AlreadyRunning(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Capability check failed: {0}")]
    Capability(String),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("State error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A started daemon, ready to serve.
pub struct Daemon {
    config: Config,
    // NOTE(lifetime): held to maintain the exclusive flock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    ctx: Arc<ListenCtx>,
    listener: UnixListener,
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Daemon {
    pub(crate) fn new(
        config: Config,
        lock_file: File,
        ctx: Arc<ListenCtx>,
        listener: UnixListener,
    ) -> Self {
        Self { config, lock_file, ctx, listener }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle for requesting shutdown from outside the serve loop.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.ctx.shutdown)
    }

    /// Serve until a shutdown signal (SIGTERM/SIGINT) or the `shutdown`
    /// command, then clean up the socket and lockfile.
    ///
    /// In-flight connection handlers are abandoned at shutdown; each one
    /// writes its response before the shutdown notification fires, so a
    /// client that triggered the stop has already been answered.
    pub async fn run(self) -> Result<(), LifecycleError> {
        let Daemon { config, lock_file, ctx, listener } = self;

        let shutdown = Arc::clone(&ctx.shutdown);
        let accept_task = tokio::spawn(Listener::new(listener, ctx).run());

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = shutdown.notified() => info!("shutdown requested"),
            _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
            _ = sigint.recv() => info!("SIGINT received, shutting down"),
        }

        accept_task.abort();

        if config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&config.socket_path) {
                warn!("failed to remove socket file: {e}");
            }
        }
        if config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&config.lock_path) {
                warn!("failed to remove lockfile: {e}");
            }
        }
        drop(lock_file);

        info!("daemon shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
