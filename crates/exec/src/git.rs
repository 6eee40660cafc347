// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git invocations: argument deny-listing and exec-mutex routing.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::runtime::{ExecError, ExecLock, ExecOutcome, ExecSpec, Executor};

/// Options that reach git's configuration or transport hooks and would
/// permit arbitrary command execution.
const FORBIDDEN_OPTIONS: &[&str] =
    &["-c", "--config", "--upload-pack", "--exec", "--receive-pack"];

const GIT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Forbidden git option: {0}")]
    ForbiddenArg(String),

    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Runs `git` through the execution runtime, sharing the exclusive mutex
/// with every other `exclusive` execution in the process.
pub struct GitRunner {
    executor: Arc<dyn Executor>,
    lock: ExecLock,
}

impl GitRunner {
    pub fn new(executor: Arc<dyn Executor>, lock: ExecLock) -> Self {
        Self { executor, lock }
    }

    /// Reject deny-listed arguments before anything is spawned.
    pub fn ensure_safe(args: &[String]) -> Result<(), GitError> {
        for arg in args {
            for option in FORBIDDEN_OPTIONS {
                if arg == option || arg.starts_with(&format!("{option}=")) {
                    return Err(GitError::ForbiddenArg(arg.clone()));
                }
            }
        }
        Ok(())
    }

    /// Run `git <args>` in `cwd`.
    ///
    /// Read-only invocations skip the mutex; they do not contend on
    /// `.git/index`.
    pub async fn run(
        &self,
        args: &[String],
        cwd: &Path,
        read_only: bool,
    ) -> Result<ExecOutcome, GitError> {
        Self::ensure_safe(args)?;
        let mut argv = vec!["git".to_string()];
        argv.extend(args.iter().cloned());
        let spec = ExecSpec {
            args: argv,
            cwd: Some(cwd.to_path_buf()),
            env: None,
            timeout: Some(GIT_TIMEOUT),
            exclusive: !read_only,
        };
        Ok(self.executor.execute(spec).await?)
    }

    /// `git add -A` then `git commit -m <message>` under a single mutex
    /// acquisition, returning early on `add` failure. Nothing else can
    /// touch the index between the two operations.
    pub async fn safe_commit(&self, cwd: &Path, message: &str) -> Result<ExecOutcome, GitError> {
        let _guard = self.lock.acquire().await;

        let add = self.run_unlocked(&["add", "-A"], cwd).await?;
        if add.returncode != 0 {
            return Ok(add);
        }
        self.run_unlocked(&["commit", "-m", message], cwd).await
    }

    /// Current HEAD commit SHA, or `None` when there is none.
    pub async fn head_sha(&self, cwd: &Path) -> Result<Option<String>, GitError> {
        let args = vec!["rev-parse".to_string(), "HEAD".to_string()];
        let out = self.run(&args, cwd, true).await?;
        Ok((out.returncode == 0).then(|| out.stdout.trim().to_string()))
    }

    /// Caller already holds the exec mutex.
    async fn run_unlocked(&self, args: &[&str], cwd: &Path) -> Result<ExecOutcome, GitError> {
        let argv: Vec<String> =
            std::iter::once("git").chain(args.iter().copied()).map(String::from).collect();
        let spec = ExecSpec {
            args: argv,
            cwd: Some(cwd.to_path_buf()),
            env: None,
            timeout: Some(GIT_TIMEOUT),
            exclusive: false,
        };
        Ok(self.executor.execute(spec).await?)
    }
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
