// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handlers for the claim/complete worker protocol.
//!
//! Trajectory and telemetry I/O runs after the store call returns, once
//! the state lock has been released.

use serde_json::json;

use harness_wire::{ClaimData, Response, TaskCompleteData};

use super::ListenCtx;

pub(crate) fn handle_claim(ctx: &ListenCtx, worker_id: &str) -> Response {
    let result = match ctx.store.claim(worker_id) {
        Ok(result) => result,
        Err(e) => return Response::error(e.to_string()),
    };

    let task_id = match &result.task {
        Some(task) => task.id.clone(),
        None => return Response::ok(ClaimData::from(result)),
    };

    ctx.log_event(&json!({
        "event_type": "task_claim",
        "task_id": task_id,
        "worker_id": worker_id,
        "is_retry": result.is_retry,
        "is_reclaim": result.is_reclaim,
    }));
    ctx.emit(json!({
        "event_type": "task_claim",
        "task_id": task_id,
        "worker_id": worker_id,
    }));

    Response::ok(ClaimData::from(result))
}

pub(crate) fn handle_complete(ctx: &ListenCtx, task_id: &str, worker_id: &str) -> Response {
    if task_id.trim().is_empty() {
        return Response::error("task_id is required");
    }
    if worker_id.trim().is_empty() {
        return Response::error("worker_id is required");
    }

    if let Err(e) = ctx.store.complete(task_id, worker_id) {
        return Response::error(e.to_string());
    }

    ctx.log_event(&json!({
        "event_type": "task_complete",
        "task_id": task_id,
        "worker_id": worker_id,
    }));
    ctx.emit(json!({
        "event_type": "task_complete",
        "task_id": task_id,
    }));

    Response::ok(TaskCompleteData { task_id: task_id.to_string() })
}
