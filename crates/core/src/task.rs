// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task records and claim results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Task execution status, serialized lowercase.
///
/// State machine: pending → running → completed | failed. A running →
/// running transition is lease renewal by the same owner, or reclaim by a
/// new owner after the lease times out. Nothing currently transitions a
/// task to `Failed`; the variant is accepted on decode and reported in
/// summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Bounds on per-task lease timeouts, in seconds.
pub const TIMEOUT_MIN: u32 = 1;
pub const TIMEOUT_MAX: u32 = 86_400;
/// Lease timeout applied when a plan does not specify one.
pub const TIMEOUT_DEFAULT: u32 = 600;

/// Errors rejecting a task record at the decode boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("Task ID cannot be empty or whitespace-only")]
    EmptyId,

    #[error("timeout_seconds must be in [{TIMEOUT_MIN}, {TIMEOUT_MAX}], got {0}")]
    TimeoutOutOfRange(u32),
}

/// Individual task in the workflow DAG.
///
/// Value object: mutations go through the state store, which substitutes a
/// whole new `Task` rather than editing fields in place. Decoding trims and
/// validates the id and range-checks the timeout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TaskRaw")]
pub struct Task {
    pub id: String,
    pub description: String,
    pub status: TaskStatus,
    pub dependencies: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub claimed_by: Option<String>,
    pub timeout_seconds: u32,
    pub instructions: Option<String>,
    pub role: Option<String>,
}

impl Task {
    /// A fresh pending task with no timestamps or owner.
    pub fn pending(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            status: TaskStatus::Pending,
            dependencies: Vec::new(),
            started_at: None,
            completed_at: None,
            claimed_by: None,
            timeout_seconds: TIMEOUT_DEFAULT,
            instructions: None,
            role: None,
        }
    }

    /// Whether a running task has exceeded its lease window at `now`.
    pub fn is_timed_out(&self, now: DateTime<Utc>) -> bool {
        let Some(started) = self.started_at else { return false };
        self.status == TaskStatus::Running
            && (now - started).num_milliseconds() > i64::from(self.timeout_seconds) * 1000
    }
}

/// Wire shape for [`Task`]; validation happens in the `TryFrom` conversion.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskRaw {
    id: String,
    description: String,
    #[serde(default = "default_status")]
    status: TaskStatus,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    claimed_by: Option<String>,
    #[serde(default = "default_timeout")]
    timeout_seconds: u32,
    #[serde(default)]
    instructions: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

fn default_status() -> TaskStatus {
    TaskStatus::Pending
}

fn default_timeout() -> u32 {
    TIMEOUT_DEFAULT
}

impl TryFrom<TaskRaw> for Task {
    type Error = TaskError;

    fn try_from(raw: TaskRaw) -> Result<Self, TaskError> {
        let id = raw.id.trim();
        if id.is_empty() {
            return Err(TaskError::EmptyId);
        }
        if !(TIMEOUT_MIN..=TIMEOUT_MAX).contains(&raw.timeout_seconds) {
            return Err(TaskError::TimeoutOutOfRange(raw.timeout_seconds));
        }
        Ok(Task {
            id: id.to_string(),
            description: raw.description,
            status: raw.status,
            dependencies: raw.dependencies,
            started_at: raw.started_at,
            completed_at: raw.completed_at,
            claimed_by: raw.claimed_by,
            timeout_seconds: raw.timeout_seconds,
            instructions: raw.instructions,
            role: raw.role,
        })
    }
}

/// Result of a claim operation.
///
/// The flags are computed atomically with the claim itself so callers never
/// observe a retry/reclaim decision made against stale state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimResult {
    pub task: Option<Task>,
    pub is_retry: bool,
    pub is_reclaim: bool,
}

impl ClaimResult {
    /// No work available.
    pub fn none() -> Self {
        Self { task: None, is_retry: false, is_reclaim: false }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
