//! Graph Nodes
//!
//! This module defines the indicator nodes that live in the dependency graph.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Scheduling metadata attached to every indicator.
///
/// `estimated_processing_time` is the node weight used for critical-path
/// and level-timing computations; `memory_usage` feeds plan memory budgets.
/// Units are whatever the caller uses consistently (the resolver only
/// compares and sums them).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Relative priority within a level (informational for the engine).
    pub priority: i64,

    /// Estimated time to compute this indicator once.
    pub estimated_processing_time: f64,

    /// Estimated peak memory while computing.
    pub memory_usage: f64,

    /// Free-form classification tags.
    pub tags: IndexSet<String>,
}

impl Default for NodeMetadata {
    fn default() -> Self {
        Self {
            priority: 0,
            estimated_processing_time: 0.0,
            memory_usage: 0.0,
            tags: IndexSet::new(),
        }
    }
}

/// A node in the dependency graph: one indicator plus its edges.
///
/// The graph maintains both edge directions: `dependencies` are the inputs
/// this indicator reads, `dependents` are the indicators that read it. The
/// store keeps the two sets exact inverses of each other graph-wide; code
/// outside the store never mutates them directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorNode {
    id: String,
    dependencies: IndexSet<String>,
    dependents: IndexSet<String>,
    metadata: NodeMetadata,
}

impl IndicatorNode {
    /// Create a new node with the given inputs and metadata.
    ///
    /// `dependents` starts empty; the store fills it in as other nodes
    /// declare this one as an input.
    pub fn new(
        id: impl Into<String>,
        dependencies: impl IntoIterator<Item = String>,
        metadata: NodeMetadata,
    ) -> Self {
        Self {
            id: id.into(),
            dependencies: dependencies.into_iter().collect(),
            dependents: IndexSet::new(),
            metadata,
        }
    }

    /// The node's unique id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The scheduling metadata.
    pub fn metadata(&self) -> &NodeMetadata {
        &self.metadata
    }

    /// Node weight for path and timing computations.
    pub fn weight(&self) -> f64 {
        self.metadata.estimated_processing_time
    }

    /// Ids this node reads from.
    pub fn dependencies(&self) -> &IndexSet<String> {
        &self.dependencies
    }

    /// Ids that read from this node.
    pub fn dependents(&self) -> &IndexSet<String> {
        &self.dependents
    }

    pub(crate) fn add_dependent(&mut self, id: impl Into<String>) {
        self.dependents.insert(id.into());
    }

    pub(crate) fn remove_dependent(&mut self, id: &str) {
        self.dependents.shift_remove(id);
    }

    pub(crate) fn remove_dependency(&mut self, id: &str) {
        self.dependencies.shift_remove(id);
    }

    pub(crate) fn set_dependencies(&mut self, deps: IndexSet<String>) {
        self.dependencies = deps;
    }

    pub(crate) fn retain_edges_in(&mut self, keep: &IndexSet<String>) {
        self.dependencies.retain(|d| keep.contains(d));
        self.dependents.retain(|d| keep.contains(d));
    }
}
