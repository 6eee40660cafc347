// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handlers for subprocess and git execution.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde_json::json;

use harness_exec::{decode_signal, ExecSpec};
use harness_wire::{ExecData, GitData, Response};

use super::ListenCtx;

/// Captured output is truncated to this many bytes in the trajectory
/// record; responses always carry the full output.
const TRUNCATE_LIMIT: usize = 4096;

pub(crate) struct ExecParams {
    pub args: Vec<String>,
    pub cwd: Option<String>,
    pub env: Option<HashMap<String, String>>,
    pub timeout: Option<f64>,
    pub exclusive: bool,
}

pub(crate) async fn handle_git(
    ctx: &ListenCtx,
    args: &[String],
    cwd: Option<&str>,
) -> Response {
    let cwd = cwd.map(PathBuf::from).unwrap_or_else(|| ctx.workspace_root.clone());
    match ctx.git.run(args, &cwd, false).await {
        Ok(out) => Response::ok(GitData {
            returncode: out.returncode,
            stdout: out.stdout,
            stderr: out.stderr,
        }),
        Err(e) => Response::error(e.to_string()),
    }
}

pub(crate) async fn handle_exec(ctx: &ListenCtx, params: ExecParams) -> Response {
    if params.args.is_empty() {
        return Response::error("args is required");
    }
    let timeout = match params.timeout {
        // Also rejects NaN and infinities, which from_secs_f64 cannot hold.
        Some(seconds) if !seconds.is_finite() || seconds <= 0.0 => {
            return Response::error("timeout must be a positive number of seconds");
        }
        Some(seconds) => Some(Duration::from_secs_f64(seconds)),
        None => None,
    };

    let spec = ExecSpec {
        args: params.args.clone(),
        cwd: params.cwd.map(PathBuf::from),
        env: params.env,
        timeout,
        exclusive: params.exclusive,
    };

    let start = Instant::now();
    let outcome = match ctx.executor.execute(spec).await {
        Ok(outcome) => outcome,
        Err(e) => return Response::error(e.to_string()),
    };
    let duration_ms = start.elapsed().as_millis() as u64;
    let signal_name = decode_signal(outcome.returncode);

    let mut event = json!({
        "event_type": "exec",
        "args": params.args,
        "returncode": outcome.returncode,
        "signal_name": signal_name,
        "stdout": truncate(&outcome.stdout),
        "stderr": truncate(&outcome.stderr),
        "duration_ms": duration_ms,
    });
    if outcome.timed_out() {
        event["timeout"] = json!(true);
    }
    ctx.log_event(&event);

    Response::ok(ExecData {
        returncode: outcome.returncode,
        stdout: outcome.stdout,
        stderr: outcome.stderr,
        signal_name,
    })
}

/// UTF-8-safe byte truncation for trajectory records.
fn truncate(s: &str) -> &str {
    if s.len() <= TRUNCATE_LIMIT {
        return s;
    }
    let mut end = TRUNCATE_LIMIT;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
