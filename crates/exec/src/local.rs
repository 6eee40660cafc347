// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor spawning children directly on the host.

use async_trait::async_trait;

use crate::runtime::{run_command, ExecError, ExecLock, ExecOutcome, ExecSpec, Executor};
#[cfg(test)]
use crate::runtime::TIMEOUT_RETURNCODE;
#[cfg(test)]
use crate::signal::decode_signal;

pub struct LocalExecutor {
    lock: ExecLock,
}

impl LocalExecutor {
    pub fn new(lock: ExecLock) -> Self {
        Self { lock }
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn execute(&self, spec: ExecSpec) -> Result<ExecOutcome, ExecError> {
        if spec.args.is_empty() {
            return Err(ExecError::EmptyArgs);
        }
        if spec.exclusive {
            let _guard = self.lock.acquire().await;
            run_command(&spec.args, spec.cwd.as_deref(), spec.env.as_ref(), spec.timeout).await
        } else {
            run_command(&spec.args, spec.cwd.as_deref(), spec.env.as_ref(), spec.timeout).await
        }
    }

    async fn check_capabilities(&self) -> Result<(), ExecError> {
        let args = vec!["git".to_string(), "--version".to_string()];
        let outcome = run_command(&args, None, None, None).await;
        match outcome {
            Ok(out) if out.returncode == 0 => Ok(()),
            _ => Err(ExecError::Capability("git not found in PATH".to_string())),
        }
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
