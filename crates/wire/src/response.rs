// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use harness_core::{ClaimResult, Task};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response from the daemon, discriminated by `status`.
///
/// Every exchange ends in exactly one of these; handler failures are
/// mapped to `Error` with a human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok { data: Value },
    Error { message: String },
}

impl Response {
    /// Success response wrapping any serializable payload.
    pub fn ok(data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Response::Ok { data: value },
            Err(e) => Response::error(format!("failed to encode response: {e}")),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error { message: message.into() }
    }
}

/// Response data for `ping`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PingData {
    pub running: bool,
    pub pid: u32,
}

/// Response data for `get_state`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateData {
    pub state: Option<Value>,
}

/// Task counts by status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusSummary {
    pub total: usize,
    pub completed: usize,
    pub running: usize,
    pub pending: usize,
    pub failed: usize,
}

/// Response data for `status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusData {
    pub active: bool,
    pub summary: StatusSummary,
    pub tasks: Value,
    pub events: Vec<Value>,
    pub active_workers: Vec<String>,
}

/// Response data for `task_claim`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimData {
    pub task: Option<Task>,
    pub is_retry: bool,
    pub is_reclaim: bool,
}

impl From<ClaimResult> for ClaimData {
    fn from(result: ClaimResult) -> Self {
        Self { task: result.task, is_retry: result.is_retry, is_reclaim: result.is_reclaim }
    }
}

/// Response data for `task_complete`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskCompleteData {
    pub task_id: String,
}

/// Response data for `git`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GitData {
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Response data for `exec`.
///
/// A subprocess timeout is not an error: it comes back as `Ok` with
/// `returncode: -15` and `signal_name: "SIGTERM"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecData {
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_name: Option<String>,
}

/// Response data for `plan_import`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanImportData {
    pub goal: String,
    pub task_count: usize,
}

/// Response data for `plan_reset`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanResetData {
    pub message: String,
}

/// Response data for `shutdown`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShutdownData {
    pub shutdown: bool,
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
