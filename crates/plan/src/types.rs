// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;

use indexmap::IndexMap;
use thiserror::Error;

use harness_core::{dag, Task, WorkflowState};

/// Errors rejecting a plan document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("No valid plan found (expected a **Goal:** marker and a Task Group table)")]
    NoPlan,

    #[error(
        "Invalid task id {0:?}: ids start with a letter or digit and \
         contain only letters, digits, '-', '_', '.'"
    )]
    InvalidTaskId(String),

    #[error("Tasks in the group table without a body section: {0}")]
    PhantomTasks(String),

    #[error("Orphan tasks not in any group: {0}. Add them to the Task Groups table.")]
    OrphanTasks(String),

    #[error("Missing dependency: {dep} (in {task})")]
    MissingDependency { dep: String, task: String },

    #[error("Cycle detected at {0}")]
    Cycle(String),
}

/// One task as declared in a plan document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanTask {
    pub description: String,
    pub dependencies: Vec<String>,
    pub timeout_seconds: u32,
    pub instructions: Option<String>,
    pub role: Option<String>,
}

/// A parsed plan: the goal plus its task definitions, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanDefinition {
    pub goal: String,
    pub tasks: IndexMap<String, PlanTask>,
}

impl PlanDefinition {
    /// Reject cycles and missing dependencies.
    pub fn validate_dag(&self) -> Result<(), PlanError> {
        for (task_id, task) in &self.tasks {
            for dep in &task.dependencies {
                if !self.tasks.contains_key(dep) {
                    return Err(PlanError::MissingDependency {
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
            Some(node) => Err(PlanError::Cycle(node.to_string())),
            None => Ok(()),
        }
    }

    /// Convert into a fresh workflow state: all tasks pending, no owners.
    pub fn into_state(self) -> WorkflowState {
        let tasks = self
            .tasks
            .into_iter()
            .map(|(id, plan_task)| {
                let mut task = Task::pending(id.clone(), plan_task.description);
                task.dependencies = plan_task.dependencies;
                task.timeout_seconds = plan_task.timeout_seconds;
                task.instructions = plan_task.instructions;
                task.role = plan_task.role;
                (id, task)
            })
            .collect();
        WorkflowState::new(tasks)
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
