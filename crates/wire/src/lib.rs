// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for daemon communication.
//!
//! Wire format: one JSON object per line, newline-terminated, in both
//! directions. A connection carries exactly one request/response exchange.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod request;
mod response;
mod wire;

pub use request::Request;
pub use response::{
    ClaimData, ExecData, GitData, PingData, PlanImportData, PlanResetData, Response, ShutdownData,
    StateData, StatusData, StatusSummary, TaskCompleteData,
};
pub use wire::{read_request, read_response, write_request, write_response, ProtocolError};
