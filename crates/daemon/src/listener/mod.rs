// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! The listener accepts connections and spawns one task per connection;
//! handlers never block one another. Each connection carries exactly one
//! request line and one response line.

mod plan;
mod run;
mod state;
mod tasks;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use harness_exec::{Executor, GitRunner};
use harness_storage::{TrajectoryLog, WorkflowStore};
use harness_wire::{
    read_request, write_response, PingData, ProtocolError, Request, Response, ShutdownData,
};

use crate::env::ipc_timeout;
use crate::telemetry::TelemetryEmitter;

/// Shared daemon context for all request handlers.
pub(crate) struct ListenCtx {
    pub store: WorkflowStore,
    pub trajectory: TrajectoryLog,
    pub telemetry: Option<TelemetryEmitter>,
    pub executor: Arc<dyn Executor>,
    pub git: GitRunner,
    pub workspace_root: PathBuf,
    pub shutdown: Arc<Notify>,
}

impl ListenCtx {
    /// Fire-and-forget telemetry; a disabled or absent emitter is a no-op.
    fn emit(&self, event: serde_json::Value) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.emit(event);
        }
    }

    /// Trajectory appends never fail a request.
    fn log_event(&self, event: &serde_json::Value) {
        if let Err(e) = self.trajectory.append(event) {
            warn!("trajectory append failed: {e}");
        }
    }
}

/// Accept loop: one spawned task per connection.
pub(crate) struct Listener {
    listener: UnixListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn new(listener: UnixListener, ctx: Arc<ListenCtx>) -> Self {
        Self { listener, ctx }
    }

    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        let (reader, writer) = stream.into_split();
                        if let Err(e) = handle_connection(reader, writer, &ctx).await {
                            log_connection_error(e);
                        }
                    });
                }
                Err(e) => error!("accept error: {e}"),
            }
        }
    }
}

fn log_connection_error(e: ProtocolError) {
    match e {
        ProtocolError::ConnectionClosed => debug!("client disconnected"),
        ProtocolError::Timeout => warn!("connection timeout"),
        _ => error!("connection error: {e}"),
    }
}

/// Handle a single client connection: read one request line, dispatch,
/// write one response line.
async fn handle_connection<R, W>(
    reader: R,
    mut writer: W,
    ctx: &ListenCtx,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let request = match read_request(&mut reader, ipc_timeout()).await {
        Ok(Some(request)) => request,
        // Empty line or immediate EOF: close silently.
        Ok(None) => return Ok(()),
        Err(ProtocolError::Invalid(e)) => {
            let response = Response::error(format!("Invalid request: {e}"));
            write_response(&mut writer, &response, ipc_timeout()).await?;
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    // Frequent polling commands log at debug, mutations at info.
    match &request {
        Request::Ping | Request::GetState | Request::Status { .. } => {
            debug!(request = ?request, "received request");
        }
        _ => info!(request = ?request, "received request"),
    }

    // Shutdown is intercepted so the ack is on the wire before the stop
    // notification fires.
    if matches!(request, Request::Shutdown) {
        let response = Response::ok(ShutdownData { shutdown: true });
        write_response(&mut writer, &response, ipc_timeout()).await?;
        ctx.shutdown.notify_one();
        return Ok(());
    }

    let response = handle_request(request, ctx).await;
    write_response(&mut writer, &response, ipc_timeout()).await
}

/// Dispatch one request to its handler. Exhaustive: an unknown command
/// never reaches this point; it fails at the decode boundary.
async fn handle_request(request: Request, ctx: &ListenCtx) -> Response {
    match request {
        Request::Ping => Response::ok(PingData { running: true, pid: std::process::id() }),

        Request::GetState => state::handle_get_state(ctx),

        Request::Status { event_count } => state::handle_status(ctx, event_count),

        Request::UpdateState { updates } => state::handle_update_state(ctx, &updates),

        Request::TaskClaim { worker_id } => tasks::handle_claim(ctx, &worker_id),

        Request::TaskComplete { task_id, worker_id } => {
            tasks::handle_complete(ctx, &task_id, &worker_id)
        }

        Request::Git { args, cwd } => run::handle_git(ctx, &args, cwd.as_deref()).await,

        Request::Exec { args, cwd, env, timeout, exclusive } => {
            run::handle_exec(ctx, run::ExecParams { args, cwd, env, timeout, exclusive }).await
        }

        Request::PlanImport { content } => plan::handle_import(ctx, &content),

        Request::PlanReset => plan::handle_reset(ctx),

        // Intercepted in handle_connection before reaching handle_request
        Request::Shutdown => unreachable!(),
    }
}

#[cfg(test)]
pub(crate) fn test_ctx(workspace: &std::path::Path) -> ListenCtx {
    use harness_exec::{ExecLock, LocalExecutor};
    use harness_storage::TRAJECTORY_FILE_NAME;

    let exec_lock = ExecLock::new();
    let executor: Arc<dyn Executor> = Arc::new(LocalExecutor::new(exec_lock.clone()));
    ListenCtx {
        store: WorkflowStore::new(workspace),
        trajectory: TrajectoryLog::new(workspace.join(".claude").join(TRAJECTORY_FILE_NAME)),
        telemetry: None,
        executor: Arc::clone(&executor),
        git: GitRunner::new(executor, exec_lock),
        workspace_root: workspace.to_path_buf(),
        shutdown: Arc::new(Notify::new()),
    }
}

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
