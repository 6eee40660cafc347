// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor routing children through `docker exec`.

use async_trait::async_trait;

use crate::path_map::PathMap;
use crate::runtime::{run_command, ExecError, ExecLock, ExecOutcome, ExecSpec, Executor};

pub struct ContainerExecutor {
    container_id: String,
    path_map: PathMap,
    lock: ExecLock,
}

impl ContainerExecutor {
    pub fn new(container_id: String, path_map: PathMap, lock: ExecLock) -> Self {
        Self { container_id, path_map, lock }
    }

    /// `docker exec --user UID:GID [-e K=V]… [-w cwd'] CONTAINER argv…`
    ///
    /// The UID:GID mapping keeps container children from running as root;
    /// the working directory is translated through the path mapper.
    fn build_argv(&self, spec: &ExecSpec) -> Vec<String> {
        let mut argv = vec!["docker".to_string(), "exec".to_string()];

        let uid = nix::unistd::getuid();
        let gid = nix::unistd::getgid();
        argv.push("--user".to_string());
        argv.push(format!("{uid}:{gid}"));

        if let Some(env) = &spec.env {
            for (key, value) in env {
                argv.push("-e".to_string());
                argv.push(format!("{key}={value}"));
            }
        }

        if let Some(cwd) = &spec.cwd {
            argv.push("-w".to_string());
            argv.push(self.path_map.to_container(&cwd.to_string_lossy()));
        }

        argv.push(self.container_id.clone());
        argv.extend(spec.args.iter().cloned());
        argv
    }
}

#[async_trait]
impl Executor for ContainerExecutor {
    async fn execute(&self, spec: ExecSpec) -> Result<ExecOutcome, ExecError> {
        if spec.args.is_empty() {
            return Err(ExecError::EmptyArgs);
        }
        let argv = self.build_argv(&spec);
        if spec.exclusive {
            let _guard = self.lock.acquire().await;
            run_command(&argv, None, None, spec.timeout).await
        } else {
            run_command(&argv, None, None, spec.timeout).await
        }
    }

    async fn check_capabilities(&self) -> Result<(), ExecError> {
        let args = vec!["docker".to_string(), "info".to_string()];
        match run_command(&args, None, None, None).await {
            Ok(out) if out.returncode == 0 => Ok(()),
            Ok(out) => {
                Err(ExecError::Capability(format!("Docker not available: {}", out.stderr)))
            }
            Err(e) => Err(ExecError::Capability(format!("Docker not available: {e}"))),
        }
    }
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
