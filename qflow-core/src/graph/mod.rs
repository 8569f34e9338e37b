//! Dependency Graph
//!
//! This module implements the dependency graph that tracks relationships
//! between indicators and their inputs.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes represent indicators with scheduling metadata
//! - Edges represent dependencies: if A reads B's output, A depends on B
//!
//! Analytics and the execution planner traverse the graph to decide which
//! indicators may run, in what order, and how many can run concurrently.
//!
//! # Design Decisions
//!
//! 1. We use a centralized graph rather than per-node links because:
//!    - It enables whole-graph topological ordering and leveling
//!    - It simplifies cycle detection
//!    - It gives the planner a single consistent view to snapshot
//!
//! 2. The graph is indexed by id for O(1) lookups, with deterministic
//!    iteration order.
//!
//! 3. We maintain both forward (dependencies) and reverse (dependents)
//!    edges to enable efficient traversal in both directions; the store
//!    keeps them exact inverses on every mutation.
//!
//! Acyclicity is an invariant the caller upholds through validation, not
//! one the store enforces on its own — see [`crate::validate`] and the
//! boundary checks in [`crate::resolver`].

mod events;
mod node;
mod query;
mod store;

pub use events::{EventBus, GraphEvent};
pub use node::{IndicatorNode, NodeMetadata};
pub use query::GraphStats;
pub use store::DependencyGraph;
