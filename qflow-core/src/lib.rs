//! QFlow Core
//!
//! This crate is the dependency-resolution and execution-planning core of
//! the QFlow indicator-evaluation platform. It decides *which* indicators
//! may run, *in what order*, and *how many* can run concurrently — it
//! never computes an indicator's value itself.
//!
//! # Architecture
//!
//! Four layers, bottom-up:
//!
//! - `graph`: the store — nodes, forward/reverse adjacency, mutation,
//!   events, and read-only queries
//! - `validate`: cycle detection and reference checks for candidate nodes
//! - `analysis`: whole-graph algorithms — topological order, strongly
//!   connected components, critical path, bottlenecks, parallelization
//!   opportunities
//! - `plan`: execution planning — dependency closure, induced subgraph,
//!   level partitioning, cost/memory/concurrency metadata
//!
//! [`resolver::DependencyResolver`] fronts all of them behind a
//! single-writer/multiple-reader lock with cached, mutation-invalidated
//! analytics and plans. Data flows one way: store, then validation, then
//! analytics and planning.
//!
//! # Example
//!
//! ```rust
//! use qflow_core::{DependencyResolver, NodeMetadata};
//!
//! let resolver = DependencyResolver::new();
//! resolver.add_indicator("close", vec![], NodeMetadata::default()).unwrap();
//! resolver.add_indicator("sma_20", vec!["close".into()], NodeMetadata::default()).unwrap();
//!
//! let plan = resolver.create_plan(&["sma_20".into()]).unwrap();
//! assert_eq!(plan.levels, vec![vec!["close".to_string()], vec!["sma_20".to_string()]]);
//! ```
//!
//! The consuming engine iterates `levels` in order, dispatches every
//! member of a level to its worker pool, and waits for the whole level
//! before starting the next.

pub mod analysis;
pub mod error;
pub mod graph;
pub mod plan;
pub mod resolver;
pub mod validate;

pub use analysis::{BottleneckThresholds, CriticalPath, DependencyAnalysis, ParallelOpportunity};
pub use error::{ResolverError, Result};
pub use graph::{DependencyGraph, GraphEvent, GraphStats, IndicatorNode, NodeMetadata};
pub use plan::{ExecutionPlan, PlanMetadata};
pub use resolver::{DependencyResolver, ResolverConfig};
pub use validate::ValidationResult;
