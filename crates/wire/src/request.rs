// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request from a client to the daemon, discriminated by `command`.
///
/// The enum is closed: an unrecognized command fails at the decode
/// boundary, so handlers never see an "unknown command" case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Full workflow state as JSON, or null when no plan is loaded
    GetState,

    /// Summary counts, active workers, and a tail of the trajectory
    Status {
        #[serde(default = "default_event_count")]
        event_count: usize,
    },

    /// Atomic field update on the workflow state
    UpdateState { updates: Map<String, Value> },

    /// Claim the next available task for a worker
    TaskClaim { worker_id: String },

    /// Mark a claimed task completed
    TaskComplete { task_id: String, worker_id: String },

    /// Run `git <args>` routed through the exec mutex
    Git {
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        cwd: Option<String>,
    },

    /// Run a subprocess
    Exec {
        args: Vec<String>,
        #[serde(default)]
        cwd: Option<String>,
        #[serde(default)]
        env: Option<HashMap<String, String>>,
        /// Seconds; fractional values allowed
        #[serde(default)]
        timeout: Option<f64>,
        #[serde(default)]
        exclusive: bool,
    },

    /// Parse a plan document and replace the workflow state
    PlanImport { content: String },

    /// Clear the workflow state
    PlanReset,

    /// Schedule an orderly shutdown; the ack is written before the
    /// socket closes
    Shutdown,
}

fn default_event_count() -> usize {
    10
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
