//! Graph Analytics
//!
//! Whole-graph algorithms over the dependency graph: topological ordering,
//! strongly connected components, critical path, bottleneck heuristics, and
//! parallelization-opportunity discovery. Everything here is a pure read;
//! the [`crate::resolver`] facade caches [`analyze`] results under the
//! graph's structural hash and invalidates on any mutation.
//!
//! Every derived ordering breaks ties canonically by id, so the analysis is
//! a pure function of graph structure — structurally equal graphs produce
//! equal analyses no matter how their nodes were inserted. The structural
//! hash used as the cache key assumes exactly this.
//!
//! Analytics assume a validated (acyclic) graph. A cycle encountered here
//! is a broken invariant, not ordinary bad input, and raises
//! [`crate::error::ResolverError::CycleDetected`].

mod critical_path;
mod topology;

pub use critical_path::{critical_path, CriticalPath};
pub use topology::{strongly_connected_components, topological_sort};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::plan::level_groups;

/// Heuristic thresholds for bottleneck flagging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckThresholds {
    /// Flag nodes with more dependents than this.
    pub max_dependents: usize,
    /// Flag nodes with a longer processing time than this.
    pub max_processing_time: f64,
}

impl Default for BottleneckThresholds {
    fn default() -> Self {
        Self {
            max_dependents: 3,
            max_processing_time: 100.0,
        }
    }
}

/// A level of the whole-graph schedule where parallel execution pays off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelOpportunity {
    /// Index of the level within the whole-graph schedule.
    pub level: usize,
    /// Members of the level.
    pub ids: Vec<String>,
    /// Total time if members ran one after another.
    pub sequential_time: f64,
    /// Time if all members ran at once (the slowest member).
    pub parallel_time: f64,
    /// `sequential_time / parallel_time`.
    pub estimated_speedup: f64,
}

/// Whole-graph analysis snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyAnalysis {
    /// Adjacency snapshot: id to dependency list, in graph order.
    pub graph: IndexMap<String, Vec<String>>,
    /// Strongly connected components (singletons included).
    pub components: Vec<Vec<String>>,
    /// Full topological order.
    pub topological_order: Vec<String>,
    /// Global critical path.
    pub critical_path: CriticalPath,
    /// Nodes flagged by the bottleneck heuristics.
    pub bottlenecks: Vec<String>,
    /// Levels worth executing in parallel.
    pub opportunities: Vec<ParallelOpportunity>,
}

/// Flag likely bottlenecks: heavily depended-upon or slow nodes.
///
/// Heuristic, not exhaustive — a fast node with few dependents can still
/// gate the critical path.
pub fn find_bottlenecks(graph: &DependencyGraph, thresholds: &BottleneckThresholds) -> Vec<String> {
    let mut flagged: Vec<String> = graph
        .iter()
        .filter(|node| {
            node.dependents().len() > thresholds.max_dependents
                || node.weight() > thresholds.max_processing_time
        })
        .map(|node| node.id().to_string())
        .collect();
    flagged.sort_unstable();
    flagged
}

/// Discover levels of the whole-graph schedule with exploitable parallelism.
pub fn parallelization_opportunities(
    graph: &DependencyGraph,
) -> Result<Vec<ParallelOpportunity>> {
    let levels = level_groups(graph)?;
    let mut opportunities = Vec::new();

    for (index, level) in levels.iter().enumerate() {
        if level.len() < 2 {
            continue;
        }

        let weights: Vec<f64> = level
            .iter()
            .map(|id| graph.get(id).map(|n| n.weight()).unwrap_or(0.0))
            .collect();
        let sequential_time: f64 = weights.iter().sum();
        let parallel_time = weights.iter().cloned().fold(0.0, f64::max);
        let estimated_speedup = if parallel_time > 0.0 {
            sequential_time / parallel_time
        } else {
            1.0
        };

        opportunities.push(ParallelOpportunity {
            level: index,
            ids: level.clone(),
            sequential_time,
            parallel_time,
            estimated_speedup,
        });
    }

    Ok(opportunities)
}

/// Run every analytic over the graph and bundle the results.
pub fn analyze(
    graph: &DependencyGraph,
    thresholds: &BottleneckThresholds,
) -> Result<DependencyAnalysis> {
    let components = strongly_connected_components(graph);

    // Defensive consistency check: a multi-member component means a cycle
    // slipped past validation and the topological sort below will fail.
    for component in &components {
        if component.len() > 1 {
            warn!(members = ?component, "strongly connected component found in graph");
        }
    }

    let topological_order = topological_sort(graph)?;
    let critical_path = critical_path(graph)?;
    let bottlenecks = find_bottlenecks(graph, thresholds);
    let opportunities = parallelization_opportunities(graph)?;

    let snapshot: IndexMap<String, Vec<String>> = graph
        .iter()
        .map(|node| {
            (
                node.id().to_string(),
                node.dependencies().iter().cloned().collect(),
            )
        })
        .collect();

    Ok(DependencyAnalysis {
        graph: snapshot,
        components,
        topological_order,
        critical_path,
        bottlenecks,
        opportunities,
    })
}
