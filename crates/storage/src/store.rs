// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow state store: exclusive owner of the persisted state file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use harness_core::{
    ClaimResult, Clock, StateError, SystemClock, Task, TaskStatus, WorkflowIndex, WorkflowState,
};

use crate::atomic::write_atomic;

/// File name under `<workspace>/.claude/`.
pub const STATE_FILE_NAME: &str = "dev-workflow-state.json";

/// Errors from workflow store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No workflow state: file not found and no cached state")]
    NoState,

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task {task} not owned by {requester} (owned by {owner})")]
    NotOwned { task: String, requester: String, owner: String },

    #[error("Worker ID cannot be empty or whitespace-only")]
    EmptyWorkerId,

    #[error("No updates provided")]
    EmptyUpdate,

    #[error("Unknown update field: {0} (only 'tasks' is mutable)")]
    UnknownField(String),

    #[error("Field {field} expects {expected}")]
    InvalidField { field: String, expected: String },

    #[error("Invalid task payload for {id}: {message}")]
    InvalidTask { id: String, message: String },

    #[error(transparent)]
    Dag(#[from] StateError),

    #[error("State file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("State file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The cached snapshot: immutable state value plus the index computed
/// from it. Replaced wholesale after each successful persist.
struct Loaded {
    state: WorkflowState,
    index: WorkflowIndex,
}

/// Thread-safe workflow state store.
///
/// One coarse mutex serializes every public operation. Hold time covers
/// in-memory mutation, JSON encoding, and the atomic disk write; callers
/// do their own trajectory logging and telemetry after the call returns,
/// outside the critical section. Memory is updated only after the disk
/// write succeeds.
pub struct WorkflowStore<C: Clock = SystemClock> {
    state_file: PathBuf,
    clock: C,
    cache: Mutex<Option<Loaded>>,
}

impl WorkflowStore<SystemClock> {
    /// Store rooted at `<workspace>/.claude/dev-workflow-state.json`.
    pub fn new(workspace_root: &Path) -> Self {
        Self::with_clock(workspace_root, SystemClock)
    }
}

impl<C: Clock> WorkflowStore<C> {
    pub fn with_clock(workspace_root: &Path, clock: C) -> Self {
        Self {
            state_file: workspace_root.join(".claude").join(STATE_FILE_NAME),
            clock,
            cache: Mutex::new(None),
        }
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    /// Load from disk, replacing any cached snapshot. `None` when the
    /// file does not exist.
    pub fn load(&self) -> Result<Option<WorkflowState>, StoreError> {
        let mut cache = self.cache.lock();
        match self.read_file()? {
            Some(state) => {
                let index = WorkflowIndex::build(&state);
                let snapshot = state.clone();
                *cache = Some(Loaded { state, index });
                Ok(Some(snapshot))
            }
            None => {
                *cache = None;
                Ok(None)
            }
        }
    }

    /// Validate and persist a whole new state (plan import / save).
    ///
    /// The DAG check runs before anything touches disk, so a rejected
    /// state leaves the previous file intact.
    pub fn save(&self, state: WorkflowState) -> Result<(), StoreError> {
        state.validate_dag()?;
        let mut cache = self.cache.lock();
        let index = WorkflowIndex::build(&state);
        self.persist(&state)?;
        *cache = Some(Loaded { state, index });
        Ok(())
    }

    /// Apply a field update and persist.
    ///
    /// The mutable surface is an explicit allow-list: only `tasks`, and
    /// every task payload passes the validating task decoder.
    pub fn update(&self, updates: &Map<String, Value>) -> Result<WorkflowState, StoreError> {
        if updates.is_empty() {
            return Err(StoreError::EmptyUpdate);
        }

        let mut cache = self.cache.lock();
        let loaded = self.ensure_loaded(&mut cache)?;

        let mut state = loaded.state.clone();
        for (field, value) in updates {
            match field.as_str() {
                "tasks" => {
                    let object = value.as_object().ok_or_else(|| StoreError::InvalidField {
                        field: "tasks".to_string(),
                        expected: "an object mapping task ids to task records".to_string(),
                    })?;
                    let mut tasks: IndexMap<String, Task> = IndexMap::new();
                    for (id, payload) in object {
                        let task: Task =
                            serde_json::from_value(payload.clone()).map_err(|e| {
                                StoreError::InvalidTask { id: id.clone(), message: e.to_string() }
                            })?;
                        tasks.insert(id.clone(), task);
                    }
                    state.tasks = tasks;
                }
                other => return Err(StoreError::UnknownField(other.to_string())),
            }
        }

        let index = WorkflowIndex::build(&state);
        self.persist(&state)?;
        *loaded = Loaded { state: state.clone(), index };
        Ok(state)
    }

    /// Atomically claim the next available task for `worker_id`.
    ///
    /// Idempotent: a worker that already holds a running task gets it back
    /// with `is_retry` set. Every claim refreshes `started_at`: lease
    /// renewal, which also prevents a timed-out owner from reclaiming its
    /// own task twice.
    pub fn claim(&self, worker_id: &str) -> Result<ClaimResult, StoreError> {
        if worker_id.trim().is_empty() {
            return Err(StoreError::EmptyWorkerId);
        }

        let mut cache = self.cache.lock();
        let loaded = self.ensure_loaded(&mut cache)?;
        let now = self.clock.now_utc();

        let Some(task) = loaded.index.task_for_worker(&loaded.state, worker_id, now) else {
            return Ok(ClaimResult::none());
        };

        // Flags are computed against the pre-claim task, atomically with
        // the claim itself.
        let was_mine = task.claimed_by.as_deref() == Some(worker_id);
        let is_retry = was_mine && task.status == TaskStatus::Running;
        let is_reclaim =
            !was_mine && task.status == TaskStatus::Running && task.is_timed_out(now);

        let mut updated = task.clone();
        updated.status = TaskStatus::Running;
        updated.claimed_by = Some(worker_id.to_string());
        updated.started_at = Some(now);

        let state = loaded.state.with_task(updated.clone());
        let index = WorkflowIndex::build(&state);
        self.persist(&state)?;
        *loaded = Loaded { state, index };

        debug!(task = %updated.id, worker = worker_id, is_retry, is_reclaim, "task claimed");
        Ok(ClaimResult { task: Some(updated), is_retry, is_reclaim })
    }

    /// Mark `task_id` completed, enforcing ownership.
    ///
    /// A worker that lost its task to a reclaim fails here, and the error
    /// names both the requester and the actual owner.
    pub fn complete(&self, task_id: &str, worker_id: &str) -> Result<Task, StoreError> {
        let mut cache = self.cache.lock();
        let loaded = self.ensure_loaded(&mut cache)?;

        let task = loaded
            .state
            .tasks
            .get(task_id)
            .ok_or_else(|| StoreError::TaskNotFound(task_id.to_string()))?;
        if task.claimed_by.as_deref() != Some(worker_id) {
            return Err(StoreError::NotOwned {
                task: task_id.to_string(),
                requester: worker_id.to_string(),
                owner: task.claimed_by.clone().unwrap_or_else(|| "nobody".to_string()),
            });
        }

        let mut updated = task.clone();
        updated.status = TaskStatus::Completed;
        updated.completed_at = Some(self.clock.now_utc());

        let state = loaded.state.with_task(updated.clone());
        let index = WorkflowIndex::build(&state);
        self.persist(&state)?;
        *loaded = Loaded { state, index };

        debug!(task = task_id, worker = worker_id, "task completed");
        Ok(updated)
    }

    /// Delete the state file if present and clear the cache.
    pub fn reset(&self) -> Result<(), StoreError> {
        let mut cache = self.cache.lock();
        match std::fs::remove_file(&self.state_file) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        *cache = None;
        Ok(())
    }

    fn read_file(&self) -> Result<Option<WorkflowState>, StoreError> {
        match std::fs::read(&self.state_file) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Lazy-load into the cache. Caller must hold the lock.
    fn ensure_loaded<'a>(
        &self,
        cache: &'a mut Option<Loaded>,
    ) -> Result<&'a mut Loaded, StoreError> {
        if cache.is_none() {
            let state = self.read_file()?.ok_or(StoreError::NoState)?;
            let index = WorkflowIndex::build(&state);
            *cache = Some(Loaded { state, index });
        }
        cache.as_mut().ok_or(StoreError::NoState)
    }

    fn persist(&self, state: &WorkflowState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(state)?;
        write_atomic(&self.state_file, &bytes)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
