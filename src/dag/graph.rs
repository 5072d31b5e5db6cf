// src/dag/graph.rs

//! Directed dependency graph over test keys.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::warn;

use crate::key;
use crate::types::{DependencyRef, TestKey};

/// Directed graph of `task -> dependency` edges.
///
/// Backed by a petgraph [`DiGraph`] so forward adjacency ("what do I depend
/// on") and reverse adjacency ("who depends on me") come from the same edge
/// set and cannot drift apart. Node insertion order is the registration
/// order; every deterministic tie-break in the orderings derives from it.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub(super) graph: DiGraph<TestKey, ()>,
    pub(super) nodes: HashMap<TestKey, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from `(key, declared dependencies)` pairs.
    ///
    /// Nodes are created first so a reference can resolve to a task declared
    /// later in the input. Each reference is resolved against the node set
    /// by probing its candidate keys; references that match no task are
    /// logged and skipped rather than failing the build.
    pub fn from_cases<'a, I>(cases: I) -> Self
    where
        I: IntoIterator<Item = (&'a TestKey, &'a [DependencyRef])>,
    {
        let pairs: Vec<(&TestKey, &[DependencyRef])> = cases.into_iter().collect();

        let mut graph = Self::new();
        for (key, _) in &pairs {
            graph.add_task((*key).clone());
        }
        for (key, deps) in &pairs {
            for dep in deps.iter() {
                match graph.resolve_reference(dep, key.file.as_deref()) {
                    Some(target) => graph.add_dependency(key, &target),
                    None => warn!(
                        task = %key,
                        reference = %dep.raw,
                        "dependency matches no known task; edge skipped"
                    ),
                }
            }
        }
        graph
    }

    /// Add a task node. Idempotent; returns the node's index.
    pub(super) fn add_task(&mut self, key: TestKey) -> NodeIndex {
        match self.nodes.get(&key) {
            Some(ix) => *ix,
            None => {
                let ix = self.graph.add_node(key.clone());
                self.nodes.insert(key, ix);
                ix
            }
        }
    }

    /// Add a `task -> dependency` edge. Idempotent; missing nodes are
    /// created on the fly.
    pub fn add_dependency(&mut self, task: &TestKey, dependency: &TestKey) {
        let from = self.add_task(task.clone());
        let to = self.add_task(dependency.clone());
        self.graph.update_edge(from, to, ());
    }

    /// Register a task with its (already resolved) dependencies.
    pub fn add_case(&mut self, key: TestKey, dependencies: &[TestKey]) {
        self.add_task(key.clone());
        for dep in dependencies {
            self.add_dependency(&key, dep);
        }
    }

    pub fn contains(&self, key: &TestKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All task keys, in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = &TestKey> {
        self.graph.node_weights()
    }

    /// Direct dependencies of a task, in declared order. Empty for unknown
    /// keys.
    pub fn dependencies_of(&self, key: &TestKey) -> Vec<TestKey> {
        self.neighbors(key, Direction::Outgoing)
    }

    /// Direct dependents of a task, in registration order. Empty for
    /// unknown keys.
    pub fn dependents_of(&self, key: &TestKey) -> Vec<TestKey> {
        self.neighbors(key, Direction::Incoming)
    }

    fn neighbors(&self, key: &TestKey, direction: Direction) -> Vec<TestKey> {
        let Some(&ix) = self.nodes.get(key) else {
            return Vec::new();
        };
        // petgraph iterates most-recently-added edge first; reverse to get
        // declaration order back.
        let mut out: Vec<TestKey> = self
            .graph
            .neighbors_directed(ix, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        out.reverse();
        out
    }

    /// Resolve a reference against the node set by probing its candidate
    /// keys in order.
    pub fn resolve_reference(
        &self,
        reference: &DependencyRef,
        context_file: Option<&str>,
    ) -> Option<TestKey> {
        key::candidate_keys(reference, context_file)
            .into_iter()
            .find(|candidate| self.nodes.contains_key(candidate))
    }
}
