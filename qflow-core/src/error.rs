//! Resolver errors
//!
//! Validation outcomes are returned as data (see [`crate::validate`]); the
//! variants here cover hard failures only: broken invariants surfaced by
//! analytics, bad plan requests, and store-boundary rejections.

use thiserror::Error;

/// Resolver result type.
pub type Result<T> = std::result::Result<T, ResolverError>;

/// Hard failures raised by the resolver.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolverError {
    /// An indicator with this id is already registered.
    #[error("indicator already registered: {0}")]
    DuplicateNode(String),

    /// One or more requested indicators are not in the graph.
    #[error("missing indicators: {}", .0.join(", "))]
    MissingIndicators(Vec<String>),

    /// A dependency cycle was found where analytics require a DAG.
    #[error("circular dependency detected: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),

    /// Admitting the node would exceed the configured graph size bound.
    #[error("graph limit exceeded: {count} nodes (max {max})")]
    GraphLimitExceeded { count: usize, max: usize },
}
