// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handlers for state queries and the field-update mutation.

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};

use harness_core::TaskStatus;
use harness_wire::{Response, StateData, StatusData, StatusSummary};

use super::ListenCtx;

pub(crate) fn handle_get_state(ctx: &ListenCtx) -> Response {
    match ctx.store.load() {
        Ok(Some(state)) => match serde_json::to_value(&state) {
            Ok(value) => Response::ok(StateData { state: Some(value) }),
            Err(e) => Response::error(e.to_string()),
        },
        Ok(None) => Response::ok(StateData { state: None }),
        Err(e) => Response::error(e.to_string()),
    }
}

pub(crate) fn handle_status(ctx: &ListenCtx, event_count: usize) -> Response {
    let state = match ctx.store.load() {
        Ok(state) => state,
        Err(e) => return Response::error(e.to_string()),
    };

    let Some(state) = state else {
        return Response::ok(StatusData {
            active: false,
            summary: StatusSummary::default(),
            tasks: json!({}),
            events: Vec::new(),
            active_workers: Vec::new(),
        });
    };

    let mut summary = StatusSummary { total: state.tasks.len(), ..StatusSummary::default() };
    let mut active_workers: BTreeSet<String> = BTreeSet::new();
    for task in state.tasks.values() {
        match task.status {
            TaskStatus::Completed => summary.completed += 1,
            TaskStatus::Running => {
                summary.running += 1;
                if let Some(worker) = &task.claimed_by {
                    active_workers.insert(worker.clone());
                }
            }
            TaskStatus::Pending => summary.pending += 1,
            TaskStatus::Failed => summary.failed += 1,
        }
    }

    let events = ctx.trajectory.tail(event_count).unwrap_or_default();
    let tasks = serde_json::to_value(&state.tasks).unwrap_or_else(|_| json!({}));

    Response::ok(StatusData {
        active: true,
        summary,
        tasks,
        events,
        active_workers: active_workers.into_iter().collect(),
    })
}

pub(crate) fn handle_update_state(ctx: &ListenCtx, updates: &Map<String, Value>) -> Response {
    match ctx.store.update(updates) {
        Ok(state) => Response::ok(state),
        Err(e) => Response::error(e.to_string()),
    }
}
