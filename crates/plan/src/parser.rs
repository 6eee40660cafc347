// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented parser for the structured Markdown plan format.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;

use harness_core::TIMEOUT_DEFAULT;

use crate::types::{PlanDefinition, PlanError, PlanTask};

const GOAL_MARKER: &str = "**Goal:**";
const GROUP_TABLE_MARKER: &str = "| Task Group |";
const TASK_HEADING: &str = "### Task ";

/// Parse and validate a plan document.
///
/// Recognizes documents carrying both the goal marker and the Task Group
/// table header; anything else is "no valid plan". The returned plan has
/// already passed DAG validation.
pub fn parse(content: &str) -> Result<PlanDefinition, PlanError> {
    if content.trim().is_empty() {
        return Err(PlanError::NoPlan);
    }
    if !content.contains(GOAL_MARKER) || !content.contains(GROUP_TABLE_MARKER) {
        return Err(PlanError::NoPlan);
    }

    let goal = extract_goal(content);
    let groups = extract_groups(content)?;
    let sections = extract_sections(content)?;

    // Phantom tasks: referenced by the table, never defined in the body.
    let mut phantom: Vec<&str> = groups
        .values()
        .flatten()
        .filter(|id| !sections.contains_key(id.as_str()))
        .map(String::as_str)
        .collect();
    phantom.sort_unstable();
    phantom.dedup();
    if !phantom.is_empty() {
        return Err(PlanError::PhantomTasks(phantom.join(", ")));
    }

    // Orphan tasks: defined in the body, not placed in any group.
    let grouped: HashSet<&str> = groups.values().flatten().map(String::as_str).collect();
    let mut orphans: Vec<&str> =
        sections.keys().map(String::as_str).filter(|id| !grouped.contains(id)).collect();
    orphans.sort_unstable();
    if !orphans.is_empty() {
        return Err(PlanError::OrphanTasks(orphans.join(", ")));
    }

    // Group N depends on the full set of group N−1 ids; group ordering is
    // numeric, not positional.
    let ordered: Vec<&Vec<String>> = groups.values().collect();
    let mut tasks: IndexMap<String, PlanTask> = IndexMap::new();
    for (i, ids) in ordered.iter().enumerate() {
        let dependencies: Vec<String> =
            if i == 0 { Vec::new() } else { ordered[i - 1].clone() };
        for id in ids.iter() {
            let Some(section) = sections.get(id.as_str()) else { continue };
            tasks.insert(
                id.clone(),
                PlanTask {
                    description: section.description.clone(),
                    dependencies: dependencies.clone(),
                    timeout_seconds: TIMEOUT_DEFAULT,
                    instructions: if section.body.is_empty() {
                        None
                    } else {
                        Some(section.body.clone())
                    },
                    role: None,
                },
            );
        }
    }

    let plan = PlanDefinition { goal, tasks };
    plan.validate_dag()?;
    Ok(plan)
}

/// Task ids must start alphanumeric and stay within a shell-safe charset.
fn validate_task_id(id: &str) -> Result<(), PlanError> {
    let mut chars = id.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(PlanError::InvalidTaskId(id.to_string()))
    }
}

fn extract_goal(content: &str) -> String {
    for line in content.lines() {
        if let Some(idx) = line.find(GOAL_MARKER) {
            let goal = line[idx + GOAL_MARKER.len()..].trim();
            if !goal.is_empty() {
                return goal.to_string();
            }
        }
    }
    "Goal not specified".to_string()
}

/// Pull `| Group N | id, id… |` rows out of the group table, keyed by
/// numeric group index.
fn extract_groups(content: &str) -> Result<BTreeMap<u32, Vec<String>>, PlanError> {
    let mut groups = BTreeMap::new();
    for line in content.lines() {
        let line = line.trim();
        if !line.starts_with('|') {
            continue;
        }
        let cells: Vec<&str> = line.trim_matches('|').split('|').map(str::trim).collect();
        if cells.len() < 2 {
            continue;
        }
        let Some(number) = cells[0].strip_prefix("Group") else { continue };
        let Ok(group_id) = number.trim().parse::<u32>() else { continue };

        let mut ids = Vec::new();
        for id in cells[1].split(',').map(str::trim).filter(|s| !s.is_empty()) {
            validate_task_id(id)?;
            ids.push(id.to_string());
        }
        groups.insert(group_id, ids);
    }
    Ok(groups)
}

struct Section {
    description: String,
    body: String,
}

/// Split the document into `### Task <id>[: <description>]` sections.
/// The body runs until the next task heading or end of document.
fn extract_sections(content: &str) -> Result<IndexMap<String, Section>, PlanError> {
    fn flush(
        current: &mut Option<(String, String, Vec<&str>)>,
        sections: &mut IndexMap<String, Section>,
    ) {
        if let Some((id, description, body)) = current.take() {
            sections.insert(
                id,
                Section { description, body: body.join("\n").trim().to_string() },
            );
        }
    }

    let mut sections: IndexMap<String, Section> = IndexMap::new();
    let mut current: Option<(String, String, Vec<&str>)> = None;

    for line in content.lines() {
        if let Some(rest) = line.strip_prefix(TASK_HEADING) {
            flush(&mut current, &mut sections);
            let (id, description) = match rest.split_once(':') {
                Some((id, description)) => (id.trim(), description.trim()),
                None => (rest.trim(), ""),
            };
            validate_task_id(id)?;
            current = Some((id.to_string(), description.to_string(), Vec::new()));
        } else if let Some((_, _, body)) = current.as_mut() {
            body.push(line);
        }
    }
    flush(&mut current, &mut sections);

    Ok(sections)
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
