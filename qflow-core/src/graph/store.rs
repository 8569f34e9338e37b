//! Graph Store
//!
//! The store owns the node table and keeps the two adjacency directions
//! consistent: for every edge `A depends on B`, `B.dependents` contains `A`.
//! Every mutation updates both directions before returning, so readers never
//! observe a half-wired edge.
//!
//! The store deliberately does not run cycle detection on mutation; that is
//! the job of [`crate::validate`] and of the [`crate::resolver`] facade,
//! which rejects cycles at its boundary. Callers that batch-validate up
//! front can drive the store directly.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{ResolverError, Result};

use super::events::{EventBus, GraphEvent};
use super::node::IndicatorNode;

/// The dependency graph: indicator nodes indexed by id.
///
/// Iteration order is insertion order (via [`IndexMap`]), which keeps
/// topological sorts and level layouts deterministic for a given mutation
/// history. [`DependencyGraph::structural_hash`] is additionally
/// order-independent, so caches key on structure alone.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: IndexMap<String, IndicatorNode>,
    events: EventBus,
}

/// Order-independent projection of a node used for structural hashing.
#[derive(Serialize)]
struct CanonicalNode<'a> {
    id: &'a str,
    dependencies: Vec<&'a str>,
    weight: f64,
    memory: f64,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a node to the graph.
    ///
    /// Fails if the id is already registered. Wires the reverse index in
    /// both directions: this node is recorded as a dependent of each of its
    /// inputs, and any existing node that already declared this id as an
    /// input is recorded as a dependent of this node.
    pub fn add_node(&mut self, mut node: IndicatorNode) -> Result<()> {
        if self.nodes.contains_key(node.id()) {
            return Err(ResolverError::DuplicateNode(node.id().to_string()));
        }

        let id = node.id().to_string();
        let dependencies: Vec<String> = node.dependencies().iter().cloned().collect();

        for dep in &dependencies {
            if let Some(dep_node) = self.nodes.get_mut(dep) {
                dep_node.add_dependent(id.clone());
            }
        }

        // Repair the reverse index for nodes admitted before their inputs.
        for existing in self.nodes.values() {
            if existing.dependencies().contains(&id) {
                node.add_dependent(existing.id());
            }
        }

        self.nodes.insert(id.clone(), node);

        debug!(%id, dependency_count = dependencies.len(), "indicator added");
        self.events
            .emit(GraphEvent::IndicatorAdded { id, dependencies });
        Ok(())
    }

    /// Remove a node, detaching it from all neighbors.
    ///
    /// Returns `false` if the id was not present.
    pub fn remove_node(&mut self, id: &str) -> bool {
        let Some(node) = self.nodes.shift_remove(id) else {
            return false;
        };

        for dep_id in node.dependencies() {
            if let Some(dep) = self.nodes.get_mut(dep_id) {
                dep.remove_dependent(id);
            }
        }

        for dependent_id in node.dependents() {
            if let Some(dependent) = self.nodes.get_mut(dependent_id) {
                dependent.remove_dependency(id);
            }
        }

        debug!(%id, "indicator removed");
        self.events.emit(GraphEvent::IndicatorRemoved {
            id: id.to_string(),
            dependencies: node.dependencies().iter().cloned().collect(),
            dependents: node.dependents().iter().cloned().collect(),
        });
        true
    }

    /// Atomically replace a node's dependency set.
    ///
    /// Reverse-index entries are dropped for removed edges and added for new
    /// ones. Returns `false` if the id was not present.
    pub fn update_dependencies(&mut self, id: &str, new_deps: IndexSet<String>) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        let old_deps = node.dependencies().clone();

        for removed in old_deps.difference(&new_deps) {
            if let Some(dep) = self.nodes.get_mut(removed) {
                dep.remove_dependent(id);
            }
        }
        for added in new_deps.difference(&old_deps) {
            if let Some(dep) = self.nodes.get_mut(added) {
                dep.add_dependent(id);
            }
        }

        let node = self.nodes.get_mut(id).expect("node checked above");
        node.set_dependencies(new_deps.clone());

        debug!(%id, "dependencies updated");
        self.events.emit(GraphEvent::DependenciesUpdated {
            id: id.to_string(),
            old_dependencies: old_deps.into_iter().collect(),
            new_dependencies: new_deps.into_iter().collect(),
        });
        true
    }

    /// Get a node by id.
    pub fn get(&self, id: &str) -> Option<&IndicatorNode> {
        self.nodes.get(id)
    }

    /// Whether a node with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over node ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Iterate over nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &IndicatorNode> {
        self.nodes.values()
    }

    /// Subscribe to mutation events.
    pub fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.events.subscribe()
    }

    /// Build the subgraph induced by `keep`: the kept nodes with both edge
    /// sets filtered to members of `keep`. Node order follows this graph.
    pub fn induced_subgraph(&self, keep: &IndexSet<String>) -> DependencyGraph {
        let mut nodes = IndexMap::with_capacity(keep.len());
        for node in self.nodes.values() {
            if !keep.contains(node.id()) {
                continue;
            }
            let mut node = node.clone();
            node.retain_edges_in(keep);
            nodes.insert(node.id().to_string(), node);
        }
        DependencyGraph {
            nodes,
            events: EventBus::new(),
        }
    }

    /// Hash of the graph structure: ids, edges, and weights.
    ///
    /// A pure function of structure — graphs reached via different mutation
    /// histories hash identically, so structurally-equal graphs share cache
    /// entries.
    pub fn structural_hash(&self) -> u64 {
        let mut entries: Vec<CanonicalNode<'_>> = self
            .nodes
            .values()
            .map(|node| {
                let mut dependencies: Vec<&str> =
                    node.dependencies().iter().map(String::as_str).collect();
                dependencies.sort_unstable();
                CanonicalNode {
                    id: node.id(),
                    dependencies,
                    weight: node.weight(),
                    memory: node.metadata().memory_usage,
                }
            })
            .collect();
        entries.sort_unstable_by(|a, b| a.id.cmp(b.id));

        let serialized =
            serde_json::to_string(&entries).expect("canonical form always serializes");
        let mut hasher = DefaultHasher::new();
        serialized.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::NodeMetadata;

    fn node(id: &str, deps: &[&str]) -> IndicatorNode {
        IndicatorNode::new(
            id,
            deps.iter().map(|d| d.to_string()),
            NodeMetadata::default(),
        )
    }

    fn weighted(id: &str, deps: &[&str], weight: f64) -> IndicatorNode {
        IndicatorNode::new(
            id,
            deps.iter().map(|d| d.to_string()),
            NodeMetadata {
                estimated_processing_time: weight,
                ..NodeMetadata::default()
            },
        )
    }

    #[test]
    fn add_and_remove_nodes() {
        let mut graph = DependencyGraph::new();

        graph.add_node(node("close", &[])).unwrap();
        graph.add_node(node("sma", &["close"])).unwrap();
        assert_eq!(graph.len(), 2);

        assert!(graph.remove_node("sma"));
        assert_eq!(graph.len(), 1);
        assert!(graph.get("sma").is_none());
        assert!(graph.get("close").is_some());

        assert!(!graph.remove_node("sma"));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut graph = DependencyGraph::new();

        graph.add_node(node("close", &[])).unwrap();
        let err = graph.add_node(node("close", &[])).unwrap_err();
        assert_eq!(err, ResolverError::DuplicateNode("close".to_string()));
    }

    #[test]
    fn add_wires_reverse_index() {
        let mut graph = DependencyGraph::new();

        graph.add_node(node("close", &[])).unwrap();
        graph.add_node(node("sma", &["close"])).unwrap();

        assert!(graph.get("close").unwrap().dependents().contains("sma"));
        assert!(graph.get("sma").unwrap().dependencies().contains("close"));
    }

    #[test]
    fn add_repairs_reverse_index_for_late_inputs() {
        let mut graph = DependencyGraph::new();

        // Dependent admitted before its input.
        graph.add_node(node("sma", &["close"])).unwrap();
        graph.add_node(node("close", &[])).unwrap();

        assert!(graph.get("close").unwrap().dependents().contains("sma"));
    }

    #[test]
    fn remove_detaches_both_directions() {
        let mut graph = DependencyGraph::new();

        graph.add_node(node("close", &[])).unwrap();
        graph.add_node(node("sma", &["close"])).unwrap();
        graph.add_node(node("cross", &["sma"])).unwrap();

        assert!(graph.remove_node("sma"));

        assert!(!graph.get("close").unwrap().dependents().contains("sma"));
        assert!(!graph.get("cross").unwrap().dependencies().contains("sma"));
    }

    #[test]
    fn update_swaps_reverse_entries() {
        let mut graph = DependencyGraph::new();

        graph.add_node(node("close", &[])).unwrap();
        graph.add_node(node("volume", &[])).unwrap();
        graph.add_node(node("signal", &["close"])).unwrap();

        let new_deps: IndexSet<String> = ["volume".to_string()].into_iter().collect();
        assert!(graph.update_dependencies("signal", new_deps));

        assert!(!graph.get("close").unwrap().dependents().contains("signal"));
        assert!(graph.get("volume").unwrap().dependents().contains("signal"));
        assert!(graph.get("signal").unwrap().dependencies().contains("volume"));

        assert!(!graph.update_dependencies("missing", IndexSet::new()));
    }

    #[test]
    fn mutations_emit_events() {
        let mut graph = DependencyGraph::new();
        let mut rx = graph.subscribe();

        graph.add_node(node("close", &[])).unwrap();
        graph.add_node(node("sma", &["close"])).unwrap();
        graph.update_dependencies("sma", IndexSet::new());
        graph.remove_node("sma");

        assert!(matches!(
            rx.try_recv().unwrap(),
            GraphEvent::IndicatorAdded { id, .. } if id == "close"
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            GraphEvent::IndicatorAdded { id, .. } if id == "sma"
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            GraphEvent::DependenciesUpdated { id, old_dependencies, .. }
                if id == "sma" && old_dependencies == vec!["close".to_string()]
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            GraphEvent::IndicatorRemoved { id, .. } if id == "sma"
        ));
    }

    #[test]
    fn structural_hash_ignores_insertion_order() {
        let mut a = DependencyGraph::new();
        a.add_node(weighted("x", &[], 1.0)).unwrap();
        a.add_node(weighted("y", &["x"], 2.0)).unwrap();

        let mut b = DependencyGraph::new();
        b.add_node(weighted("y", &["x"], 2.0)).unwrap();
        b.add_node(weighted("x", &[], 1.0)).unwrap();

        assert_eq!(a.structural_hash(), b.structural_hash());
    }

    #[test]
    fn structural_hash_tracks_weights_and_edges() {
        let mut a = DependencyGraph::new();
        a.add_node(weighted("x", &[], 1.0)).unwrap();

        let mut b = DependencyGraph::new();
        b.add_node(weighted("x", &[], 2.0)).unwrap();
        assert_ne!(a.structural_hash(), b.structural_hash());

        let mut c = DependencyGraph::new();
        c.add_node(weighted("x", &[], 1.0)).unwrap();
        c.add_node(weighted("z", &["x"], 1.0)).unwrap();

        let mut d = DependencyGraph::new();
        d.add_node(weighted("x", &[], 1.0)).unwrap();
        d.add_node(weighted("z", &[], 1.0)).unwrap();
        assert_ne!(c.structural_hash(), d.structural_hash());
    }
}
