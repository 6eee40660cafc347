// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow state: the task DAG plus the derived claim indexes.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dag;
use crate::task::{Task, TaskStatus};

/// DAG integrity errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("Missing dependency: {dep} (required by {task})")]
    MissingDependency { dep: String, task: String },

    #[error("Dependency cycle detected at: {0}")]
    Cycle(String),
}

/// The entire workflow DAG.
///
/// Value-semantic: every mutation substitutes a task and yields a new
/// state. The lookup indexes are deliberately not part of this type; they
/// live in [`WorkflowIndex`] and never reach the on-disk representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowState {
    #[serde(default)]
    pub tasks: IndexMap<String, Task>,
}

impl WorkflowState {
    pub fn new(tasks: IndexMap<String, Task>) -> Self {
        Self { tasks }
    }

    /// Substitute one task, returning the new state.
    pub fn with_task(&self, task: Task) -> Self {
        let mut tasks = self.tasks.clone();
        tasks.insert(task.id.clone(), task);
        Self { tasks }
    }

    /// DAG integrity: every dependency exists and the graph is acyclic.
    /// O(V + E).
    pub fn validate_dag(&self) -> Result<(), StateError> {
        for (task_id, task) in &self.tasks {
            for dep in &task.dependencies {
                if !self.tasks.contains_key(dep) {
                    return Err(StateError::MissingDependency {
                        dep: dep.clone(),
                        task: task_id.clone(),
                    });
                }
            }
        }

        let graph: HashMap<&str, &[String]> = self
            .tasks
            .iter()
            .map(|(id, t)| (id.as_str(), t.dependencies.as_slice()))
            .collect();
        match dag::detect_cycle(&graph) {
            Some(node) => Err(StateError::Cycle(node.to_string())),
            None => Ok(()),
        }
    }

    /// All of `task`'s dependencies are completed.
    ///
    /// A dangling dependency id reads as unsatisfied; `validate_dag`
    /// rejects such states before they are persisted.
    pub fn deps_satisfied(&self, task: &Task) -> bool {
        task.dependencies
            .iter()
            .all(|dep| self.tasks.get(dep).is_some_and(|d| d.status == TaskStatus::Completed))
    }
}

/// Derived lookup structures over a [`WorkflowState`].
///
/// Never persisted; rebuilt from the canonical task map on every load or
/// mutation. Invariants after every rebuild:
/// - the pending deque and set hold exactly the pending task ids;
/// - the worker map points each claiming worker at its running task.
///
/// The claim path is allowed to repair stale entries in place (a deque
/// entry whose task has moved on), which only ever shrinks the indexes.
#[derive(Debug, Default)]
pub struct WorkflowIndex {
    pending: VecDeque<String>,
    pending_set: HashSet<String>,
    workers: HashMap<String, String>,
}

impl WorkflowIndex {
    /// Rebuild all indexes from the canonical task map. O(n log n).
    pub fn build(state: &WorkflowState) -> Self {
        let mut pending: Vec<String> = Vec::new();
        let mut workers = HashMap::new();

        for task in state.tasks.values() {
            match task.status {
                TaskStatus::Pending => pending.push(task.id.clone()),
                TaskStatus::Running => {
                    if let Some(worker) = &task.claimed_by {
                        workers.insert(worker.clone(), task.id.clone());
                    }
                }
                TaskStatus::Completed | TaskStatus::Failed => {}
            }
        }

        // Fewer dependencies first; stable, so plan order breaks ties.
        pending.sort_by_key(|id| state.tasks.get(id).map_or(0, |t| t.dependencies.len()));

        let pending_set = pending.iter().cloned().collect();
        Self { pending: pending.into(), pending_set, workers }
    }

    /// Next task eligible for claiming, or `None`.
    ///
    /// Fast path walks the pending deque: stale entries are dropped from
    /// deque and set, blocked tasks rotate to the back. Rotations are
    /// capped at the deque length observed at entry (adjusted after any
    /// removal) so a fully blocked pool terminates. Slow path scans for a
    /// timed-out running task whose dependencies are complete.
    ///
    /// The returned task is not popped; the subsequent claim rebuilds the
    /// indexes and finalizes removal.
    pub fn claimable<'s>(
        &mut self,
        state: &'s WorkflowState,
        now: DateTime<Utc>,
    ) -> Option<&'s Task> {
        let mut rotations = 0;
        let mut max_rotations = self.pending.len();

        while !self.pending.is_empty() && rotations <= max_rotations {
            let task_id = match self.pending.front() {
                Some(id) => id.clone(),
                None => break,
            };

            let Some(task) = state.tasks.get(&task_id) else {
                self.pending.pop_front();
                self.pending_set.remove(&task_id);
                max_rotations = self.pending.len();
                continue;
            };
            if task.status != TaskStatus::Pending {
                self.pending.pop_front();
                self.pending_set.remove(&task_id);
                max_rotations = self.pending.len();
                continue;
            }

            if state.deps_satisfied(task) {
                return Some(task);
            }

            // Blocked: rotate to the back and try the next candidate.
            self.pending.pop_front();
            self.pending.push_back(task_id);
            rotations += 1;
        }

        // Recovery path: a running task whose lease expired.
        state.tasks.values().find(|&t| {
            t.status == TaskStatus::Running && t.is_timed_out(now) && state.deps_satisfied(t)
        })
    }

    /// Worker-scoped lookup: the idempotency path for repeated claims.
    ///
    /// Returns the worker's current running task if the index entry is
    /// still valid; otherwise drops the stale entry and falls back to
    /// [`Self::claimable`].
    pub fn task_for_worker<'s>(
        &mut self,
        state: &'s WorkflowState,
        worker_id: &str,
        now: DateTime<Utc>,
    ) -> Option<&'s Task> {
        let cached = self.workers.get(worker_id).cloned();
        if let Some(task_id) = cached {
            if let Some(task) = state.tasks.get(&task_id) {
                if task.status == TaskStatus::Running
                    && task.claimed_by.as_deref() == Some(worker_id)
                {
                    return Some(task);
                }
            }
            // Stale entry: task gone, finished, or reclaimed by someone else.
            self.workers.remove(worker_id);
        }
        self.claimable(state, now)
    }

    /// Check the index invariants against `state`. Test support only.
    #[cfg(any(test, feature = "test-support"))]
    pub fn verify(&self, state: &WorkflowState) -> Result<(), String> {
        let deque_set: HashSet<&String> = self.pending.iter().collect();
        if deque_set.len() != self.pending.len() {
            return Err("pending deque contains duplicates".to_string());
        }
        let set_refs: HashSet<&String> = self.pending_set.iter().collect();
        if deque_set != set_refs {
            return Err("pending deque and pending set diverge".to_string());
        }
        for id in &self.pending {
            match state.tasks.get(id) {
                Some(t) if t.status == TaskStatus::Pending => {}
                _ => return Err(format!("pending index entry {id} is not a pending task")),
            }
        }
        for (id, task) in &state.tasks {
            if task.status == TaskStatus::Pending && !self.pending_set.contains(id) {
                return Err(format!("pending task {id} missing from index"));
            }
            if task.status == TaskStatus::Running {
                if let Some(worker) = &task.claimed_by {
                    if self.workers.get(worker).map(String::as_str) != Some(id.as_str()) {
                        return Err(format!("running task {id} missing from worker index"));
                    }
                }
            }
        }
        for (worker, id) in &self.workers {
            match state.tasks.get(id) {
                Some(t)
                    if t.status == TaskStatus::Running
                        && t.claimed_by.as_deref() == Some(worker.as_str()) => {}
                _ => return Err(format!("worker index entry {worker} -> {id} is stale")),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
