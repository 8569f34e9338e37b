//! Dependency Resolver
//!
//! The facade that owns the graph and coordinates the layers below it:
//! store mutation, validation, analytics, and planning.
//!
//! # Concurrency
//!
//! The graph sits behind a [`parking_lot::RwLock`]: mutations serialize
//! against each other and against reads, because a partially rewired
//! reverse index is not a valid graph state. Readers (validation,
//! analytics, planning, queries) run concurrently and each sees a
//! consistent snapshot for the duration of its algorithm. The resolver
//! performs no blocking I/O; every operation is pure in-memory computation,
//! safe to call synchronously from any thread.
//!
//! # Caching
//!
//! Analysis results are cached under the graph's structural hash; plans
//! are cached under the sorted, deduplicated requested-id list. Any
//! mutation clears both caches unconditionally while the write lock is
//! still held — coarse invalidation, correctness over precision.
//!
//! # Boundary validation
//!
//! Unlike the raw [`DependencyGraph`] store, the facade refuses to admit
//! mutations that would break acyclicity or reference unknown ids: the
//! two-step validate-then-mutate contract collapses into one atomic
//! operation here. Callers that batch-validate up front can still drive
//! the store directly.

use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexSet;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::analysis::{self, BottleneckThresholds, DependencyAnalysis};
use crate::error::{ResolverError, Result};
use crate::graph::{DependencyGraph, GraphEvent, GraphStats, IndicatorNode, NodeMetadata};
use crate::plan::{self, ExecutionPlan};
use crate::validate::{validate, ValidationResult, DEFAULT_MAX_DEPTH};

/// Tunable bounds for the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Dependency-chain depth beyond which validation warns.
    pub max_depth: usize,
    /// Hard cap on graph size, enforced at admission.
    pub max_nodes: usize,
    /// Thresholds for bottleneck flagging.
    pub bottlenecks: BottleneckThresholds,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_nodes: 10_000,
            bottlenecks: BottleneckThresholds::default(),
        }
    }
}

/// Thread-safe owner of the dependency graph and its derived caches.
pub struct DependencyResolver {
    graph: RwLock<DependencyGraph>,
    plan_cache: DashMap<u64, Arc<ExecutionPlan>>,
    analysis_cache: DashMap<u64, Arc<DependencyAnalysis>>,
    config: ResolverConfig,
}

impl DependencyResolver {
    /// Create a resolver with default configuration.
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default())
    }

    /// Create a resolver with the given configuration.
    pub fn with_config(config: ResolverConfig) -> Self {
        Self {
            graph: RwLock::new(DependencyGraph::new()),
            plan_cache: DashMap::new(),
            analysis_cache: DashMap::new(),
            config,
        }
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Admit a new indicator, validating at the boundary.
    ///
    /// Rejects duplicates, unknown dependency ids, dependency cycles, and
    /// additions beyond `max_nodes`. Depth warnings are logged but do not
    /// block.
    pub fn add_indicator(
        &self,
        id: &str,
        dependencies: Vec<String>,
        metadata: NodeMetadata,
    ) -> Result<()> {
        let mut graph = self.graph.write();

        if graph.len() >= self.config.max_nodes {
            return Err(ResolverError::GraphLimitExceeded {
                count: graph.len(),
                max: self.config.max_nodes,
            });
        }
        if graph.contains(id) {
            return Err(ResolverError::DuplicateNode(id.to_string()));
        }

        let deps: IndexSet<String> = dependencies.into_iter().collect();
        self.check_admissible(&graph, id, &deps)?;

        graph.add_node(IndicatorNode::new(id, deps, metadata))?;
        self.invalidate_caches();
        Ok(())
    }

    /// Remove an indicator, detaching it from all neighbors.
    pub fn remove_indicator(&self, id: &str) -> bool {
        let mut graph = self.graph.write();
        let removed = graph.remove_node(id);
        if removed {
            self.invalidate_caches();
        }
        removed
    }

    /// Replace an indicator's dependency set, validating at the boundary.
    ///
    /// Returns `Ok(false)` when the id is unknown.
    pub fn update_dependencies(&self, id: &str, dependencies: Vec<String>) -> Result<bool> {
        let mut graph = self.graph.write();
        if !graph.contains(id) {
            return Ok(false);
        }

        let deps: IndexSet<String> = dependencies.into_iter().collect();
        self.check_admissible(&graph, id, &deps)?;

        let updated = graph.update_dependencies(id, deps);
        if updated {
            self.invalidate_caches();
        }
        Ok(updated)
    }

    fn check_admissible(
        &self,
        graph: &DependencyGraph,
        id: &str,
        deps: &IndexSet<String>,
    ) -> Result<()> {
        let result = validate(graph, id, deps, self.config.max_depth);
        for warning in &result.warnings {
            warn!(indicator = id, "{warning}");
        }
        if let Some(cycle) = result.circular_dependencies.first() {
            return Err(ResolverError::CycleDetected(cycle.clone()));
        }
        if !result.errors.is_empty() {
            let mut missing: Vec<String> = deps
                .iter()
                .filter(|dep| !graph.contains(dep))
                .cloned()
                .collect();
            missing.sort_unstable();
            return Err(ResolverError::MissingIndicators(missing));
        }
        Ok(())
    }

    fn invalidate_caches(&self) {
        self.plan_cache.clear();
        self.analysis_cache.clear();
        debug!("derived caches invalidated");
    }

    // ------------------------------------------------------------------
    // Validation, analytics, planning
    // ------------------------------------------------------------------

    /// Validate a candidate without mutating anything.
    pub fn validate(&self, id: &str, dependencies: &[String]) -> ValidationResult {
        let deps: IndexSet<String> = dependencies.iter().cloned().collect();
        let graph = self.graph.read();
        validate(&graph, id, &deps, self.config.max_depth)
    }

    /// Whole-graph analysis, cached under the graph's structural hash.
    pub fn analyze(&self) -> Result<Arc<DependencyAnalysis>> {
        let graph = self.graph.read();
        let key = graph.structural_hash();

        if let Some(hit) = self.analysis_cache.get(&key) {
            debug!(key, "analysis cache hit");
            return Ok(Arc::clone(&hit));
        }

        let analysis = Arc::new(analysis::analyze(&graph, &self.config.bottlenecks)?);
        self.analysis_cache.insert(key, Arc::clone(&analysis));
        Ok(analysis)
    }

    /// Execution plan for the requested indicators, cached by request set.
    pub fn create_plan(&self, requested: &[String]) -> Result<Arc<ExecutionPlan>> {
        let key = plan::plan_cache_key(requested);

        if let Some(hit) = self.plan_cache.get(&key) {
            debug!(key, "plan cache hit");
            return Ok(Arc::clone(&hit));
        }

        let graph = self.graph.read();
        let plan = Arc::new(plan::create_plan(&graph, requested)?);
        self.plan_cache.insert(key, Arc::clone(&plan));
        Ok(plan)
    }

    /// Just the level lists of [`Self::create_plan`].
    pub fn resolve_execution_order(&self, requested: &[String]) -> Result<Vec<Vec<String>>> {
        Ok(self.create_plan(requested)?.levels.clone())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Snapshot of a node.
    pub fn get(&self, id: &str) -> Option<IndicatorNode> {
        self.graph.read().get(id).cloned()
    }

    /// Direct dependencies of a node.
    pub fn dependencies_of(&self, id: &str) -> Option<Vec<String>> {
        self.graph
            .read()
            .dependencies_of(id)
            .map(|deps| deps.iter().cloned().collect())
    }

    /// Direct dependents of a node.
    pub fn dependents_of(&self, id: &str) -> Option<Vec<String>> {
        self.graph
            .read()
            .dependents_of(id)
            .map(|deps| deps.iter().cloned().collect())
    }

    /// Every indicator `id` transitively depends on.
    pub fn all_dependencies(&self, id: &str) -> Vec<String> {
        self.graph.read().all_dependencies(id).into_iter().collect()
    }

    /// Every indicator that transitively depends on `id`.
    pub fn all_dependents(&self, id: &str) -> Vec<String> {
        self.graph.read().all_dependents(id).into_iter().collect()
    }

    /// Whether `a` transitively depends on `b`.
    pub fn depends_on(&self, a: &str, b: &str) -> bool {
        self.graph.read().depends_on(a, b)
    }

    /// Whole-graph statistics.
    pub fn stats(&self) -> GraphStats {
        self.graph.read().stats()
    }

    /// Whether an indicator with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.graph.read().contains(id)
    }

    /// Number of indicators in the graph.
    pub fn len(&self) -> usize {
        self.graph.read().len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.read().is_empty()
    }

    /// Subscribe to mutation events.
    pub fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.graph.read().subscribe()
    }
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(resolver: &DependencyResolver, id: &str, deps: &[&str]) {
        resolver
            .add_indicator(
                id,
                deps.iter().map(|d| d.to_string()).collect(),
                NodeMetadata::default(),
            )
            .unwrap();
    }

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn add_rejects_unknown_dependencies() {
        let resolver = DependencyResolver::new();
        let err = resolver
            .add_indicator("sma", ids(&["close"]), NodeMetadata::default())
            .unwrap_err();

        assert_eq!(err, ResolverError::MissingIndicators(ids(&["close"])));
        assert!(resolver.is_empty());
    }

    #[test]
    fn add_rejects_duplicates() {
        let resolver = DependencyResolver::new();
        add(&resolver, "close", &[]);

        let err = resolver
            .add_indicator("close", Vec::new(), NodeMetadata::default())
            .unwrap_err();
        assert_eq!(err, ResolverError::DuplicateNode("close".to_string()));
    }

    #[test]
    fn update_rejects_cycles_at_the_boundary() {
        let resolver = DependencyResolver::new();
        add(&resolver, "a", &[]);
        add(&resolver, "b", &["a"]);

        let err = resolver.update_dependencies("a", ids(&["b"])).unwrap_err();
        assert!(matches!(err, ResolverError::CycleDetected(_)));

        // Graph unchanged.
        assert!(resolver.dependencies_of("a").unwrap().is_empty());
    }

    #[test]
    fn update_of_unknown_id_returns_false() {
        let resolver = DependencyResolver::new();
        assert_eq!(resolver.update_dependencies("ghost", Vec::new()), Ok(false));
    }

    #[test]
    fn max_nodes_is_a_hard_precondition() {
        let resolver = DependencyResolver::with_config(ResolverConfig {
            max_nodes: 2,
            ..ResolverConfig::default()
        });
        add(&resolver, "a", &[]);
        add(&resolver, "b", &[]);

        let err = resolver
            .add_indicator("c", Vec::new(), NodeMetadata::default())
            .unwrap_err();
        assert_eq!(err, ResolverError::GraphLimitExceeded { count: 2, max: 2 });
    }

    #[test]
    fn plans_are_cached_until_mutation() {
        let resolver = DependencyResolver::new();
        add(&resolver, "a", &[]);
        add(&resolver, "b", &["a"]);

        let first = resolver.create_plan(&ids(&["b"])).unwrap();
        let second = resolver.create_plan(&ids(&["b"])).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        add(&resolver, "c", &[]);
        let third = resolver.create_plan(&ids(&["b"])).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn analysis_is_cached_by_structure() {
        let resolver = DependencyResolver::new();
        add(&resolver, "a", &[]);
        add(&resolver, "b", &["a"]);

        let first = resolver.analyze().unwrap();
        let second = resolver.analyze().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn remove_and_identical_readd_reproduce_analysis() {
        let resolver = DependencyResolver::new();
        add(&resolver, "a", &[]);
        add(&resolver, "b", &["a"]);

        let before = resolver.analyze().unwrap();

        assert!(resolver.remove_indicator("b"));
        add(&resolver, "b", &["a"]);

        let after = resolver.analyze().unwrap();
        assert_eq!(*before, *after);
    }

    #[test]
    fn readding_a_middle_node_reproduces_analysis() {
        let resolver = DependencyResolver::new();
        add(&resolver, "a", &[]);
        add(&resolver, "b", &["a"]);
        add(&resolver, "c", &["a"]);
        add(&resolver, "d", &["b", "c"]);

        let before = resolver.analyze().unwrap();

        // Removing "b" also strips the d -> b edge, so restore it after
        // re-admission. The rebuilt graph is structurally identical but has
        // a different insertion order.
        assert!(resolver.remove_indicator("b"));
        add(&resolver, "b", &["a"]);
        assert!(resolver.update_dependencies("d", ids(&["b", "c"])).unwrap());

        let after = resolver.analyze().unwrap();
        assert_eq!(*before, *after);
    }

    #[test]
    fn resolve_execution_order_returns_levels() {
        let resolver = DependencyResolver::new();
        add(&resolver, "a", &[]);
        add(&resolver, "b", &["a"]);
        add(&resolver, "c", &["a"]);
        add(&resolver, "d", &["b", "c"]);

        let levels = resolver.resolve_execution_order(&ids(&["d"])).unwrap();
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[0], vec!["a"]);
        assert_eq!(levels[2], vec!["d"]);
    }

    #[test]
    fn events_flow_through_the_facade() {
        let resolver = DependencyResolver::new();
        let mut rx = resolver.subscribe();

        add(&resolver, "close", &[]);
        resolver.remove_indicator("close");

        assert!(matches!(
            rx.try_recv().unwrap(),
            GraphEvent::IndicatorAdded { id, .. } if id == "close"
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            GraphEvent::IndicatorRemoved { id, .. } if id == "close"
        ));
    }

    #[test]
    fn depth_warning_does_not_block_admission() {
        let resolver = DependencyResolver::new();
        add(&resolver, "n0", &[]);
        for i in 1..=12 {
            let prev = format!("n{}", i - 1);
            resolver
                .add_indicator(
                    &format!("n{i}"),
                    vec![prev],
                    NodeMetadata::default(),
                )
                .unwrap();
        }
        assert_eq!(resolver.len(), 13);
    }
}
