// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! harness: thin client for the workspace coordination daemon.
//!
//! Every subcommand maps onto one wire request; the daemon is spawned on
//! demand when the socket is not answering.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod worker_id;

use std::io::Read;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use harness_wire::{Request, Response};

use client::DaemonClient;

#[derive(Parser)]
#[command(name = "harness", about = "Coordinate multi-worker dev workflows", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Check whether the daemon is running (spawns it if not)
    Ping,

    /// Claim the next available task
    Claim {
        /// Worker id override (defaults to the persisted per-user id)
        #[arg(long)]
        worker: Option<String>,
    },

    /// Mark a claimed task completed
    Complete {
        task_id: String,
        #[arg(long)]
        worker: Option<String>,
    },

    /// Workflow summary with recent trajectory events
    Status {
        #[arg(short = 'n', long, default_value_t = 10)]
        events: usize,
    },

    /// Dump the full workflow state as JSON
    State,

    /// Plan management
    Plan {
        #[command(subcommand)]
        command: PlanCmd,
    },

    /// Run git through the daemon's exec mutex
    Git {
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },

    /// Run a subprocess through the daemon
    Exec {
        /// Timeout in seconds (fractional allowed)
        #[arg(long)]
        timeout: Option<f64>,
        /// Serialize against other exclusive executions
        #[arg(long)]
        exclusive: bool,
        #[arg(trailing_var_arg = true, required = true)]
        args: Vec<String>,
    },

    /// Stop the daemon
    Shutdown,
}

#[derive(Subcommand)]
enum PlanCmd {
    /// Import a plan document (path, or `-` for stdin)
    Import { file: String },
    /// Clear the workflow state
    Reset,
    /// Print the plan document template
    Template,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("harness: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let client = DaemonClient::new();

    let request = match cli.command {
        Cmd::Ping => Request::Ping,
        Cmd::Claim { worker } => Request::TaskClaim {
            worker_id: worker.unwrap_or_else(worker_id::worker_id),
        },
        Cmd::Complete { task_id, worker } => Request::TaskComplete {
            task_id,
            worker_id: worker.unwrap_or_else(worker_id::worker_id),
        },
        Cmd::Status { events } => Request::Status { event_count: events },
        Cmd::State => Request::GetState,
        Cmd::Plan { command } => match command {
            PlanCmd::Import { file } => {
                Request::PlanImport { content: read_plan_content(&file)? }
            }
            PlanCmd::Reset => Request::PlanReset,
            PlanCmd::Template => {
                println!("{}", harness_plan::template());
                return Ok(ExitCode::SUCCESS);
            }
        },
        Cmd::Git { args } => Request::Git { args, cwd: None },
        Cmd::Exec { timeout, exclusive, args } => {
            Request::Exec { args, cwd: None, env: None, timeout, exclusive }
        }
        Cmd::Shutdown => {
            // Stopping a daemon that is not running must not spawn one.
            return match client.request(&Request::Shutdown).await {
                Ok(response) => print_response(response),
                Err(_) => {
                    println!("Daemon not running");
                    Ok(ExitCode::SUCCESS)
                }
            };
        }
    };

    let response = client.request_or_spawn(&request).await?;
    print_response(response)
}

fn print_response(response: Response) -> Result<ExitCode> {
    match response {
        Response::Ok { data } => {
            println!("{}", serde_json::to_string_pretty(&data)?);
            Ok(ExitCode::SUCCESS)
        }
        Response::Error { message } => {
            eprintln!("harness: {message}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn read_plan_content(file: &str) -> Result<String> {
    if file == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("failed to read plan from stdin")?;
        Ok(content)
    } else {
        std::fs::read_to_string(file).with_context(|| format!("failed to read plan file {file}"))
    }
}
