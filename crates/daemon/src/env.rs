// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

/// Socket path: `HARNESS_SOCKET`, else
/// `${XDG_RUNTIME_DIR:-/tmp}/harness-${USER:-default}.sock`.
pub fn socket_path() -> PathBuf {
    if let Ok(path) = std::env::var("HARNESS_SOCKET") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    let user = std::env::var("USER").unwrap_or_else(|_| "default".to_string());
    PathBuf::from(runtime_dir).join(format!("harness-{user}.sock"))
}

/// Workspace root: `HARNESS_WORKSPACE`, else the current directory.
pub fn workspace_root() -> PathBuf {
    if let Ok(root) = std::env::var("HARNESS_WORKSPACE") {
        if !root.is_empty() {
            return PathBuf::from(root);
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Per-connection IPC timeout (`HARNESS_IPC_TIMEOUT_MS`, default 10 s).
pub fn ipc_timeout() -> Duration {
    std::env::var("HARNESS_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(10))
}

/// Telemetry endpoint port (`HARNESS_ACP_PORT`); unset disables the
/// emitter entirely.
pub fn acp_port() -> Option<u16> {
    std::env::var("HARNESS_ACP_PORT").ok().and_then(|s| s.parse::<u16>().ok())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
