// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cycle detection over dependency graphs.

use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Find a node lying on a cycle, if any.
///
/// Iterative DFS with three-color marking; the explicit stack keeps deep
/// graphs (1000+ nodes) from overflowing the thread stack. Edges to ids
/// absent from `graph` are skipped; the missing-dependency pass runs
/// before this one. O(V + E).
pub fn detect_cycle<'a>(graph: &HashMap<&'a str, &'a [String]>) -> Option<&'a str> {
    let mut color: HashMap<&str, Color> = graph.keys().map(|&k| (k, Color::White)).collect();

    for (&start, &edges) in graph {
        if color.get(start) != Some(&Color::White) {
            continue;
        }

        let mut stack: Vec<(&'a str, std::slice::Iter<'a, String>)> = vec![(start, edges.iter())];
        color.insert(start, Color::Gray);

        loop {
            let next = match stack.last_mut() {
                Some((_, neighbors)) => neighbors.next(),
                None => break,
            };
            match next {
                Some(dep) => {
                    let dep = dep.as_str();
                    match color.get(dep) {
                        // Back edge into the current DFS path
                        Some(Color::Gray) => return Some(dep),
                        Some(Color::White) => {
                            if let Some(&dep_edges) = graph.get(dep) {
                                color.insert(dep, Color::Gray);
                                stack.push((dep, dep_edges.iter()));
                            }
                        }
                        // Black, or an id outside the graph
                        _ => {}
                    }
                }
                None => {
                    if let Some((node, _)) = stack.pop() {
                        color.insert(node, Color::Black);
                    }
                }
            }
        }
    }

    None
}

#[cfg(test)]
#[path = "dag_tests.rs"]
mod tests;
