// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handlers for plan import and reset.

use serde_json::json;

use harness_plan::PlanError;
use harness_wire::{PlanImportData, PlanResetData, Response};

use super::ListenCtx;

pub(crate) fn handle_import(ctx: &ListenCtx, content: &str) -> Response {
    let plan = match harness_plan::parse(content) {
        Ok(plan) => plan,
        Err(e @ PlanError::NoPlan) => {
            return Response::error(format!(
                "{e}. Run 'harness plan template' to see the required format."
            ));
        }
        Err(e) => return Response::error(e.to_string()),
    };

    let goal = plan.goal.clone();
    let task_count = plan.tasks.len();

    // The save validates the DAG again and only then replaces the file;
    // a rejected plan leaves prior state untouched.
    if let Err(e) = ctx.store.save(plan.into_state()) {
        return Response::error(e.to_string());
    }

    ctx.log_event(&json!({
        "event_type": "plan_import",
        "goal": goal,
        "task_count": task_count,
    }));
    ctx.emit(json!({
        "event_type": "plan_import",
        "goal": goal,
        "task_count": task_count,
    }));

    Response::ok(PlanImportData { goal, task_count })
}

pub(crate) fn handle_reset(ctx: &ListenCtx) -> Response {
    if let Err(e) = ctx.store.reset() {
        return Response::error(e.to_string());
    }

    ctx.log_event(&json!({"event_type": "plan_reset"}));
    ctx.emit(json!({"event_type": "plan_reset"}));

    Response::ok(PlanResetData { message: "Workflow state cleared".to_string() })
}
