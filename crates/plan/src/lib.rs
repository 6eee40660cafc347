// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan ingestion: structured Markdown plan documents → task DAG.
//!
//! The canonical plan format is Markdown: a `**Goal:**` line, a Task Group
//! table assigning task ids to numbered groups, and one `### Task <id>`
//! section per task. Tasks in group N depend on every task in group N−1;
//! the format deliberately encodes a layered topology.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod parser;
mod template;
mod types;

pub use parser::parse;
pub use template::template;
pub use types::{PlanDefinition, PlanError, PlanTask};
