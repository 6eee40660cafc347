// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-safe registry of known workspaces.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Could not determine home directory")]
    NoHome,

    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry encode error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One registered workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectEntry {
    pub path: String,
    /// RFC-3339 UTC
    pub last_active: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    projects: BTreeMap<String, ProjectEntry>,
}

/// Process-safe project registry with file locking.
///
/// Every read-modify-write runs under an exclusive flock on the sibling
/// `.lock` file, so concurrent daemons registering different workspaces
/// cannot lose entries.
pub struct ProjectRegistry {
    registry_file: PathBuf,
    lock_file: PathBuf,
}

impl ProjectRegistry {
    /// Registry at `HARNESS_REGISTRY_FILE`, or `~/.harness/registry.json`.
    pub fn from_env() -> Result<Self, RegistryError> {
        let path = match std::env::var("HARNESS_REGISTRY_FILE") {
            Ok(p) if !p.is_empty() => PathBuf::from(p),
            _ => dirs::home_dir()
                .ok_or(RegistryError::NoHome)?
                .join(".harness")
                .join("registry.json"),
        };
        Ok(Self::at(path))
    }

    pub fn at(registry_file: PathBuf) -> Self {
        let lock_file = registry_file.with_extension("lock");
        Self { registry_file, lock_file }
    }

    /// Stable 16-hex id for a workspace path.
    pub fn hash_for_path(workspace: &Path) -> String {
        let canonical = workspace.canonicalize().unwrap_or_else(|_| workspace.to_path_buf());
        let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
        digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
    }

    /// Register a workspace; returns its hash id.
    pub fn register(&self, workspace: &Path) -> Result<String, RegistryError> {
        let canonical = workspace.canonicalize().unwrap_or_else(|_| workspace.to_path_buf());
        let hash = Self::hash_for_path(&canonical);

        let _lock = self.acquire_lock()?;
        let mut data = self.load_unlocked();
        data.projects.insert(
            hash.clone(),
            ProjectEntry {
                path: canonical.to_string_lossy().into_owned(),
                last_active: Utc::now().to_rfc3339(),
            },
        );
        self.save_unlocked(&data)?;
        Ok(hash)
    }

    /// All registered workspaces.
    pub fn list_projects(&self) -> Result<BTreeMap<String, ProjectEntry>, RegistryError> {
        let _lock = self.acquire_lock()?;
        Ok(self.load_unlocked().projects)
    }

    /// Exclusive flock, released when the returned handle drops.
    fn acquire_lock(&self) -> Result<File, RegistryError> {
        if let Some(parent) = self.lock_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_file)?;
        file.lock_exclusive()?;
        Ok(file)
    }

    /// Corrupt or unreadable registries read as empty. Caller holds the
    /// lock.
    fn load_unlocked(&self) -> RegistryFile {
        std::fs::read(&self.registry_file)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default()
    }

    fn save_unlocked(&self, data: &RegistryFile) -> Result<(), RegistryError> {
        let bytes = serde_json::to_vec_pretty(data)?;
        crate::atomic::write_atomic(&self.registry_file, &bytes)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
