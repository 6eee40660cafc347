// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stable per-user worker identity, persisted across CLI invocations.

use std::io::Write;
use std::path::{Path, PathBuf};

const PREFIX: &str = "worker-";
const HEX_LEN: usize = 12;

/// Worker id file: `HARNESS_WORKER_ID_FILE`, else
/// `${XDG_RUNTIME_DIR:-/tmp}/harness-worker-${USER:-default}.id`.
fn worker_id_file() -> PathBuf {
    if let Ok(path) = std::env::var("HARNESS_WORKER_ID_FILE") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    let user = std::env::var("USER").unwrap_or_else(|_| "default".to_string());
    PathBuf::from(runtime_dir).join(format!("harness-worker-{user}.id"))
}

/// Stable worker id.
///
/// Reads the persisted id when it validates; otherwise generates
/// `worker-<12 hex>` and persists it with an atomic 0600 write. When
/// persistence fails (read-only filesystem), the fresh id is still
/// returned: ephemeral, but usable.
pub fn worker_id() -> String {
    let path = worker_id_file();

    if let Ok(existing) = std::fs::read_to_string(&path) {
        let existing = existing.trim();
        if is_valid(existing) {
            return existing.to_string();
        }
    }

    let hex = uuid::Uuid::new_v4().simple().to_string();
    let id = format!("{PREFIX}{}", &hex[..HEX_LEN]);
    let _ = persist(&path, &id);
    id
}

fn is_valid(id: &str) -> bool {
    match id.strip_prefix(PREFIX) {
        Some(suffix) => {
            suffix.len() == HEX_LEN && suffix.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

fn persist(path: &Path, id: &str) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(&tmp)?;
    file.write_all(id.as_bytes())?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
#[path = "worker_id_tests.rs"]
mod tests;
