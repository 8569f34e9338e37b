//! Validation & Cycle Detection
//!
//! Checks a proposed node (id plus dependency set) against the live graph
//! before admission. Outcomes are returned as data, never as errors, so
//! callers decide policy:
//!
//! - `errors` block admission (unknown dependency ids)
//! - `circular_dependencies` list each offending cycle as an ordered id
//!   sequence; any entry makes the result invalid
//! - `warnings` do not block (overly deep dependency chains)
//!
//! The candidate is overlaid on the graph for the duration of the check —
//! equivalent to temporarily inserting it and removing it afterwards, but
//! without ever mutating the graph. Cycle detection runs over the whole
//! overlaid graph with an iterative depth-first search: a node encountered
//! again while still on the traversal stack marks a cycle, recorded as the
//! stack slice from its first occurrence to the repeat, inclusive.

use std::collections::HashMap;

use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::debug;

use crate::graph::DependencyGraph;

/// Default bound on dependency-chain depth before a warning is raised.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Outcome of validating a candidate node.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    /// True when there are no errors and no cycles.
    pub is_valid: bool,
    /// Conditions that block admission.
    pub errors: Vec<String>,
    /// Advisory conditions; admission may proceed.
    pub warnings: Vec<String>,
    /// Each detected cycle as an ordered id sequence.
    pub circular_dependencies: Vec<Vec<String>>,
}

/// Validate a candidate node against the graph.
///
/// `candidate_id` may already exist in the graph, in which case the
/// candidate dependency set is validated as a replacement for the node's
/// current one (the `update_dependencies` case).
pub fn validate<'a>(
    graph: &'a DependencyGraph,
    candidate_id: &'a str,
    candidate_deps: &'a IndexSet<String>,
    max_depth: usize,
) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for dep in candidate_deps {
        if !graph.contains(dep) {
            errors.push(format!("unknown dependency: {dep}"));
        }
    }

    // Dependency lookup with the candidate overlaid on the live graph.
    let deps_of = |id: &str| -> Option<&'a IndexSet<String>> {
        if id == candidate_id {
            Some(candidate_deps)
        } else {
            graph.dependencies_of(id)
        }
    };

    let mut roots: Vec<&str> = vec![candidate_id];
    roots.extend(graph.ids().filter(|id| *id != candidate_id));
    let circular_dependencies = detect_cycles(&roots, &deps_of);

    let depth = dependency_depth(candidate_id, &deps_of);
    if depth > max_depth {
        warnings.push(format!(
            "dependency chain depth {depth} exceeds maximum {max_depth}"
        ));
    }

    let is_valid = errors.is_empty() && circular_dependencies.is_empty();
    if !is_valid {
        debug!(
            candidate = candidate_id,
            error_count = errors.len(),
            cycle_count = circular_dependencies.len(),
            "validation rejected candidate"
        );
    }

    ValidationResult {
        is_valid,
        errors,
        warnings,
        circular_dependencies,
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    Gray,
    Black,
}

/// Full-graph cycle detection, iterative DFS with an explicit stack.
fn detect_cycles<'a>(
    roots: &[&'a str],
    deps_of: &impl Fn(&str) -> Option<&'a IndexSet<String>>,
) -> Vec<Vec<String>> {
    let children = |id: &str| -> Vec<&'a str> {
        deps_of(id)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default()
    };

    let mut cycles: Vec<Vec<String>> = Vec::new();
    let mut color: HashMap<&'a str, Color> = HashMap::new();
    // (node, edge list, edge cursor) frames; `path` mirrors the frame stack.
    let mut frames: Vec<(&'a str, Vec<&'a str>, usize)> = Vec::new();
    let mut path: Vec<&'a str> = Vec::new();

    for &root in roots {
        if color.contains_key(root) {
            continue;
        }

        color.insert(root, Color::Gray);
        frames.push((root, children(root), 0));
        path.push(root);

        while !frames.is_empty() {
            let next_child = {
                let (_, kids, cursor) = frames.last_mut().expect("frames is non-empty");
                let child = kids.get(*cursor).copied();
                if child.is_some() {
                    *cursor += 1;
                }
                child
            };

            match next_child {
                Some(child) => match color.get(child) {
                    Some(Color::Gray) => {
                        // Back edge: slice from the child's first occurrence
                        // on the path through the current node, then repeat
                        // the child to close the loop.
                        let pos = path
                            .iter()
                            .position(|p| *p == child)
                            .expect("gray node is on the path");
                        let mut cycle: SmallVec<[&str; 8]> = SmallVec::from_slice(&path[pos..]);
                        cycle.push(child);
                        cycles.push(cycle.into_iter().map(str::to_string).collect());
                    }
                    Some(Color::Black) => {}
                    None => {
                        color.insert(child, Color::Gray);
                        frames.push((child, children(child), 0));
                        path.push(child);
                    }
                },
                None => {
                    let (id, _, _) = frames.pop().expect("frames is non-empty");
                    color.insert(id, Color::Black);
                    path.pop();
                }
            }
        }
    }

    cycles
}

/// Longest dependency chain below `start`, in edges.
///
/// Guarded against cycles: an edge back onto the current path is skipped,
/// so the walk terminates even when validation is about to reject.
fn dependency_depth<'a>(
    start: &'a str,
    deps_of: &impl Fn(&str) -> Option<&'a IndexSet<String>>,
) -> usize {
    let children = |id: &str| -> Vec<&'a str> {
        deps_of(id)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default()
    };

    let mut memo: HashMap<&'a str, usize> = HashMap::new();
    let mut on_path: IndexSet<&'a str> = IndexSet::new();
    // (node, edge list, edge cursor, best child depth so far)
    let mut frames: Vec<(&'a str, Vec<&'a str>, usize, usize)> = Vec::new();

    on_path.insert(start);
    frames.push((start, children(start), 0, 0));

    while !frames.is_empty() {
        let next_child = {
            let (_, kids, cursor, _) = frames.last_mut().expect("frames is non-empty");
            let child = kids.get(*cursor).copied();
            if child.is_some() {
                *cursor += 1;
            }
            child
        };

        match next_child {
            Some(child) => {
                if let Some(&known) = memo.get(child) {
                    let (_, _, _, best) = frames.last_mut().expect("frames is non-empty");
                    *best = (*best).max(known + 1);
                } else if !on_path.contains(child) {
                    on_path.insert(child);
                    frames.push((child, children(child), 0, 0));
                }
            }
            None => {
                let (id, _, _, best) = frames.pop().expect("frames is non-empty");
                memo.insert(id, best);
                on_path.shift_remove(id);
                if let Some((_, _, _, parent_best)) = frames.last_mut() {
                    *parent_best = (*parent_best).max(best + 1);
                }
            }
        }
    }

    memo.get(start).copied().unwrap_or(0)
}
