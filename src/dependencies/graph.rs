//! # Dependency Graph
//!
//! Directed graph of named dependencies. Edges are stored in both
//! directions: each node lists what it depends on and what depends on it.

use crate::error::{HealthError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One vertex of the dependency graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub name: String,
    /// Outgoing edges: nodes this one depends on
    pub dependencies: BTreeSet<String>,
    /// Incoming edges: nodes that depend on this one
    pub dependents: BTreeSet<String>,
}

impl GraphNode {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, GraphNode>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update `name` so that it depends on exactly `dependencies`.
    ///
    /// Unknown dependencies are back-filled as placeholder nodes. Edges left
    /// over from a previous dependency list are removed.
    pub fn add_node<I, S>(&mut self, name: &str, dependencies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let wanted: BTreeSet<String> = dependencies.into_iter().map(Into::into).collect();

        let previous = self
            .nodes
            .entry(name.to_string())
            .or_insert_with(|| GraphNode::new(name))
            .dependencies
            .clone();

        for stale in previous.difference(&wanted) {
            if let Some(node) = self.nodes.get_mut(stale) {
                node.dependents.remove(name);
            }
        }

        for dependency in &wanted {
            self.nodes
                .entry(dependency.clone())
                .or_insert_with(|| GraphNode::new(dependency.clone()))
                .dependents
                .insert(name.to_string());
        }

        if let Some(node) = self.nodes.get_mut(name) {
            node.dependencies = wanted;
        }
    }

    /// Detach `name` from every neighbor, then delete it
    pub fn remove_node(&mut self, name: &str) -> Option<GraphNode> {
        let node = self.nodes.remove(name)?;

        for dependency in &node.dependencies {
            if let Some(neighbor) = self.nodes.get_mut(dependency) {
                neighbor.dependents.remove(name);
            }
        }
        for dependent in &node.dependents {
            if let Some(neighbor) = self.nodes.get_mut(dependent) {
                neighbor.dependencies.remove(name);
            }
        }

        Some(node)
    }

    pub fn node(&self, name: &str) -> Option<&GraphNode> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.nodes
            .get(name)
            .map(|node| node.dependents.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Dependencies before dependents, ties broken by name.
    ///
    /// Returns an empty Vec when the graph contains a cycle; callers must
    /// not confuse that with an empty graph.
    pub fn topological_sort(&self) -> Vec<String> {
        let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
        let mut order = Vec::with_capacity(self.nodes.len());

        for name in self.nodes.keys() {
            if !marks.contains_key(name.as_str()) && !self.visit(name, &mut marks, &mut order) {
                return Vec::new();
            }
        }

        order
    }

    /// Returns false on a back edge
    fn visit<'a>(&'a self, name: &'a str, marks: &mut BTreeMap<&'a str, Mark>, order: &mut Vec<String>) -> bool {
        match marks.get(name) {
            Some(Mark::Done) => return true,
            Some(Mark::InProgress) => return false,
            None => {}
        }

        marks.insert(name, Mark::InProgress);

        if let Some(node) = self.nodes.get(name) {
            for dependency in &node.dependencies {
                if !self.visit(dependency, marks, order) {
                    return false;
                }
            }
        }

        marks.insert(name, Mark::Done);
        order.push(name.to_string());
        true
    }

    pub fn validate_cycles(&self) -> Result<()> {
        if !self.nodes.is_empty() && self.topological_sort().is_empty() {
            return Err(HealthError::CycleDetected {
                node_count: self.nodes.len(),
            });
        }
        Ok(())
    }
}
