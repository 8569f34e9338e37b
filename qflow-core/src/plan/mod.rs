//! Execution Planner
//!
//! Turns a requested subset of indicators into an ordered execution plan.
//! The planner computes the transitive-dependency closure of the request,
//! restricts the graph to it, and partitions the result into levels:
//! batches with no dependency relationship among their members, safe to
//! execute concurrently. The consuming engine runs every member of a level
//! in parallel and waits for the whole level before starting the next —
//! later levels assume earlier levels' outputs exist.
//!
//! Level assignment is stricter than plain topological order: each pass
//! places every node whose dependencies all sit in strictly earlier levels,
//! so every node lands in the earliest level it can and the level count is
//! minimal.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::analysis::critical_path;
use crate::error::{ResolverError, Result};
use crate::graph::DependencyGraph;

/// Derived cost and concurrency figures for a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMetadata {
    /// Number of indicators in the plan (request plus closure).
    pub total_indicators: usize,
    /// Size of the largest level.
    pub max_concurrency: usize,
    /// Sum of `memory_usage` over all included indicators.
    pub memory_required: f64,
}

/// An ordered, level-partitioned schedule for a requested indicator set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Batches in execution order; members of a batch are independent.
    pub levels: Vec<Vec<String>>,
    /// Critical path restricted to the plan's subgraph.
    pub critical_path: Vec<String>,
    /// Sum over levels of the slowest member's weight.
    pub estimated_execution_time: f64,
    pub metadata: PlanMetadata,
}

/// Partition the whole graph into minimal execution levels.
///
/// Level members are sorted by id, so the layout is a pure function of
/// graph structure. Fails with [`ResolverError::CycleDetected`] when some
/// nodes can never be placed.
pub fn level_groups(graph: &DependencyGraph) -> Result<Vec<Vec<String>>> {
    let mut placed: HashMap<&str, usize> = HashMap::with_capacity(graph.len());
    let mut remaining: Vec<&str> = graph.ids().collect();
    let mut levels: Vec<Vec<String>> = Vec::new();

    while !remaining.is_empty() {
        let mut level: Vec<&str> = Vec::new();
        for &id in &remaining {
            let node = graph.get(id).expect("remaining id exists in the graph");
            // Edges pointing outside the graph cannot gate scheduling.
            let ready = node
                .dependencies()
                .iter()
                .all(|dep| !graph.contains(dep) || placed.contains_key(dep.as_str()));
            if ready {
                level.push(id);
            }
        }

        if level.is_empty() {
            let mut stuck: Vec<String> = remaining.iter().map(|id| id.to_string()).collect();
            stuck.sort_unstable();
            return Err(ResolverError::CycleDetected(stuck));
        }

        // Canonical in-level order: which level a node lands in is purely
        // structural, so sorting members makes the whole layout independent
        // of insertion history.
        level.sort_unstable();

        for &id in &level {
            placed.insert(id, levels.len());
        }
        remaining.retain(|id| !placed.contains_key(*id));
        levels.push(level.into_iter().map(str::to_string).collect());
    }

    Ok(levels)
}

/// Create an execution plan for the requested indicators.
///
/// The plan covers the requested ids plus everything they transitively
/// depend on. Requests naming unknown ids fail listing every missing one.
#[instrument(skip(graph, requested), fields(requested = requested.len()))]
pub fn create_plan(graph: &DependencyGraph, requested: &[String]) -> Result<ExecutionPlan> {
    let mut missing: Vec<String> = requested
        .iter()
        .filter(|id| !graph.contains(id))
        .cloned()
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        missing.dedup();
        return Err(ResolverError::MissingIndicators(missing));
    }

    let relevant = relevant_set(graph, requested);
    let subgraph = graph.induced_subgraph(&relevant);

    let levels = level_groups(&subgraph)?;
    let critical = critical_path(&subgraph)?;

    let estimated_execution_time = levels
        .iter()
        .map(|level| {
            level
                .iter()
                .map(|id| {
                    subgraph
                        .get(id)
                        .map(|node| node.weight())
                        .unwrap_or_default()
                })
                .fold(0.0, f64::max)
        })
        .sum();

    let memory_required = relevant
        .iter()
        .filter_map(|id| graph.get(id))
        .map(|node| node.metadata().memory_usage)
        .sum();
    let max_concurrency = levels.iter().map(Vec::len).max().unwrap_or(0);

    debug!(
        indicators = relevant.len(),
        levels = levels.len(),
        max_concurrency,
        "execution plan created"
    );

    Ok(ExecutionPlan {
        levels,
        critical_path: critical.ids,
        estimated_execution_time,
        metadata: PlanMetadata {
            total_indicators: relevant.len(),
            max_concurrency,
            memory_required,
        },
    })
}

/// Cache key for a plan request: the sorted, deduplicated id list.
///
/// Order- and duplicate-insensitive, so `["d", "b", "d"]` and `["b", "d"]`
/// hit the same entry. The cache is cleared wholesale on any graph
/// mutation, so graph state does not participate in the key.
pub fn plan_cache_key(requested: &[String]) -> u64 {
    let mut ids: Vec<&str> = requested.iter().map(String::as_str).collect();
    ids.sort_unstable();
    ids.dedup();

    let mut hasher = DefaultHasher::new();
    ids.hash(&mut hasher);
    hasher.finish()
}

/// Requested ids plus the full transitive closure of their dependencies.
fn relevant_set(graph: &DependencyGraph, requested: &[String]) -> IndexSet<String> {
    let mut relevant: IndexSet<String> = IndexSet::new();
    let mut stack: Vec<&str> = requested.iter().map(String::as_str).collect();

    while let Some(id) = stack.pop() {
        if !relevant.insert(id.to_string()) {
            continue;
        }
        if let Some(node) = graph.get(id) {
            stack.extend(node.dependencies().iter().map(String::as_str));
        }
    }

    relevant
}
