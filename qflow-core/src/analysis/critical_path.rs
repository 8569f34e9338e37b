//! Critical path computation
//!
//! Standard longest-path-in-a-DAG (PERT/CPM): every node's distance starts
//! at its own weight; processing nodes in topological order, each dependent
//! relaxes to `max(current, distance[node] + dependent weight)` with the
//! winning predecessor recorded. The path is rebuilt by walking predecessor
//! links backward from the globally farthest node.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::DependencyGraph;

use super::topology::topological_sort;

/// The highest-total-weight chain of dependent nodes.
///
/// Bounds the minimum possible total execution time of the graph no matter
/// how much parallelism is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalPath {
    /// Chain members in execution order.
    pub ids: Vec<String>,
    /// Sum of member weights.
    pub total_weight: f64,
}

impl CriticalPath {
    fn empty() -> Self {
        Self {
            ids: Vec::new(),
            total_weight: 0.0,
        }
    }
}

/// Compute the critical path of the graph.
///
/// Ties break toward the canonical topological order, so structurally
/// equal graphs yield the same path. Fails with
/// [`crate::error::ResolverError::CycleDetected`] when the graph is not a
/// DAG.
pub fn critical_path(graph: &DependencyGraph) -> Result<CriticalPath> {
    if graph.is_empty() {
        return Ok(CriticalPath::empty());
    }

    let order = topological_sort(graph)?;

    let mut distance: HashMap<&str, f64> = HashMap::with_capacity(graph.len());
    let mut predecessor: HashMap<&str, &str> = HashMap::new();

    for node in graph.iter() {
        distance.insert(node.id(), node.weight());
    }

    for id in &order {
        let node = graph.get(id).expect("ordered id exists in the graph");
        let here = distance[node.id()];

        for dependent_id in node.dependents() {
            let Some(dependent) = graph.get(dependent_id) else {
                continue;
            };
            let candidate = here + dependent.weight();
            let entry = distance
                .get_mut(dependent.id())
                .expect("all nodes have a distance");
            if candidate > *entry {
                *entry = candidate;
                predecessor.insert(dependent.id(), node.id());
            }
        }
    }

    // Scan in canonical order with a strict comparison: ties go to the
    // earliest node, so the chosen endpoint is a pure function of structure.
    let mut cursor = order.first().map(String::as_str).expect("graph is non-empty");
    let mut total_weight = distance[cursor];
    for id in &order {
        let weight = distance[id.as_str()];
        if weight > total_weight {
            total_weight = weight;
            cursor = id.as_str();
        }
    }

    let mut ids = vec![cursor.to_string()];
    while let Some(&prev) = predecessor.get(cursor) {
        ids.push(prev.to_string());
        cursor = prev;
    }
    ids.reverse();

    Ok(CriticalPath { ids, total_weight })
}
