//! Groundwork dependency resolver
//!
//! Builds a directed graph from resource declarations and computes a
//! deterministic execution order: every node appears after all nodes it
//! references, with ties broken by declaration order. Cycles and dangling
//! references are configuration errors raised before anything executes.

pub mod error;
pub mod graph;

// Re-exports
pub use error::{GraphError, Result};
pub use graph::{EdgeKind, ResourceGraph};
