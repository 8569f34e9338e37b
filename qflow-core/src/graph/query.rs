//! Graph queries
//!
//! Pure read operations over the graph: direct and transitive neighbor
//! lookups plus whole-graph statistics. Nothing here is cached — every
//! operation is O(1) or O(reachable) and the transitive walks carry a
//! visited set, so they terminate even on a malformed (cyclic) graph.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::store::DependencyGraph;

/// Whole-graph shape statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    /// Mean dependent count across all nodes.
    pub avg_fan_out: f64,
    /// Largest dependent count of any node.
    pub max_fan_out: usize,
    /// Nodes with no edges at all.
    pub isolated_count: usize,
    /// Nodes with no dependencies but at least one dependent.
    pub root_count: usize,
    /// Nodes with no dependents but at least one dependency.
    pub leaf_count: usize,
}

impl DependencyGraph {
    /// Direct dependencies of a node.
    pub fn dependencies_of(&self, id: &str) -> Option<&IndexSet<String>> {
        self.get(id).map(|node| node.dependencies())
    }

    /// Direct dependents of a node.
    pub fn dependents_of(&self, id: &str) -> Option<&IndexSet<String>> {
        self.get(id).map(|node| node.dependents())
    }

    /// Transitive closure over `dependencies` edges, excluding `id` itself.
    pub fn all_dependencies(&self, id: &str) -> IndexSet<String> {
        self.closure(id, |node| node.dependencies())
    }

    /// Transitive closure over `dependents` edges, excluding `id` itself.
    pub fn all_dependents(&self, id: &str) -> IndexSet<String> {
        self.closure(id, |node| node.dependents())
    }

    /// Whether `a` transitively depends on `b`.
    pub fn depends_on(&self, a: &str, b: &str) -> bool {
        self.all_dependencies(a).contains(b)
    }

    fn closure<'a>(
        &'a self,
        start: &str,
        edges: impl Fn(&'a super::node::IndicatorNode) -> &'a IndexSet<String>,
    ) -> IndexSet<String> {
        let mut visited: IndexSet<String> = IndexSet::new();
        let mut stack: Vec<&str> = Vec::new();

        if let Some(node) = self.get(start) {
            stack.extend(edges(node).iter().map(String::as_str));
        }

        while let Some(id) = stack.pop() {
            if !visited.insert(id.to_string()) {
                continue;
            }
            if let Some(node) = self.get(id) {
                stack.extend(edges(node).iter().map(String::as_str));
            }
        }

        visited
    }

    /// Compute whole-graph statistics.
    pub fn stats(&self) -> GraphStats {
        let node_count = self.len();
        let mut edge_count = 0;
        let mut max_fan_out = 0;
        let mut total_fan_out = 0;
        let mut isolated_count = 0;
        let mut root_count = 0;
        let mut leaf_count = 0;

        for node in self.iter() {
            let deps = node.dependencies().len();
            let fans = node.dependents().len();
            edge_count += deps;
            total_fan_out += fans;
            max_fan_out = max_fan_out.max(fans);

            match (deps, fans) {
                (0, 0) => isolated_count += 1,
                (0, _) => root_count += 1,
                (_, 0) => leaf_count += 1,
                _ => {}
            }
        }

        let avg_fan_out = if node_count == 0 {
            0.0
        } else {
            total_fan_out as f64 / node_count as f64
        };

        GraphStats {
            node_count,
            edge_count,
            avg_fan_out,
            max_fan_out,
            isolated_count,
            root_count,
            leaf_count,
        }
    }
}
