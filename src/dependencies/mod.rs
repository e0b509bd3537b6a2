//! # Dependencies
//!
//! Named external dependencies, ordered by a [`DependencyGraph`] and checked
//! by a [`DependencyManager`] that propagates critical failures to their
//! dependents.

pub mod graph;
pub mod manager;

pub use graph::{DependencyGraph, GraphNode};
pub use manager::{DependencyDescriptor, DependencyManager, DependencyStatus};
