//! kube-checker library
//!
//! Builds a graph of every object in a Kubernetes cluster, linked by
//! ownership and reference edges, and evaluates audit rules against it.
//! It can be used both as a binary and as a library for testing.

pub mod check;
pub mod cli;
pub mod config;
pub mod graph;
pub mod kube;
pub mod models;
pub mod output;

// Re-export commonly used types for convenience
pub use check::{Checker, CheckError, RuleRegistry, RuleResult, RuleResults, Violation};
pub use graph::{Graph, GraphBuilder, GraphError, KindRegistry};
pub use models::{ObjectReference, Resource};
