// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! harnessd: the workspace coordination daemon.
//!
//! Usage: `harnessd [workspace_root]`. The socket path comes from
//! `HARNESS_SOCKET` or the per-user default; logs go to
//! `<workspace>/.claude/daemon.log` (filter via `HARNESS_LOG`).

use std::path::PathBuf;
use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;

use harness_daemon::{startup, Config};

#[tokio::main]
async fn main() -> ExitCode {
    let mut config = Config::load();
    if let Some(root) = std::env::args().nth(1) {
        config = Config::new(PathBuf::from(root), config.socket_path.clone());
    }

    let _log_guard = init_logging(&config);

    let daemon = match startup(config).await {
        Ok(daemon) => daemon,
        Err(e) => {
            // Startup failures must reach the spawning client's eyes even
            // when the log file is not yet in place.
            eprintln!("harnessd: {e}");
            error!("startup failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    match daemon.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("daemon exited with error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter =
        EnvFilter::try_from_env("HARNESS_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let log_dir = config.workspace_root.join(".claude");
    if std::fs::create_dir_all(&log_dir).is_err() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return None;
    }

    let appender = tracing_appender::rolling::never(&log_dir, "daemon.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}
