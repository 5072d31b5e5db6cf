// src/dag/order.rs

//! Cycle detection and deterministic orderings over the dependency graph.

use petgraph::Direction;
use petgraph::graph::NodeIndex;

use crate::dag::graph::DependencyGraph;
use crate::errors::{Result, TestdagError};
use crate::types::TestKey;

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

enum Step {
    Enter(NodeIndex),
    Leave(NodeIndex),
}

impl DependencyGraph {
    /// Depth-first cycle check over every node.
    ///
    /// On the first back edge found, returns [`TestdagError::Cycle`] whose
    /// path lists the keys along the cycle with the repeated key at both
    /// ends, e.g. `a -> b -> a`. Tasks are explored in registration order
    /// and dependencies in declared order, so the reported cycle is stable
    /// for a given input.
    pub fn validate_acyclic(&self) -> Result<()> {
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
        for start in self.graph.node_indices() {
            if marks[start.index()] == Mark::Unvisited {
                if let Some(path) = self.find_cycle_from(start, &mut marks) {
                    return Err(TestdagError::Cycle { path });
                }
            }
        }
        Ok(())
    }

    /// Iterative DFS from `start`, keeping the recursion chain explicitly so
    /// a back edge can be expanded into the full cycle path.
    fn find_cycle_from(&self, start: NodeIndex, marks: &mut [Mark]) -> Option<Vec<TestKey>> {
        let mut work: Vec<Step> = vec![Step::Enter(start)];
        let mut chain: Vec<NodeIndex> = Vec::new();

        while let Some(step) = work.pop() {
            match step {
                Step::Enter(node) => match marks[node.index()] {
                    Mark::Done => {}
                    Mark::OnStack => {
                        // Back edge from the current chain head into `node`:
                        // everything from its first occurrence onward is the
                        // cycle.
                        let pos = chain
                            .iter()
                            .position(|&n| n == node)
                            .unwrap_or_default();
                        let mut path: Vec<TestKey> = chain[pos..]
                            .iter()
                            .map(|&n| self.graph[n].clone())
                            .collect();
                        path.push(self.graph[node].clone());
                        return Some(path);
                    }
                    Mark::Unvisited => {
                        marks[node.index()] = Mark::OnStack;
                        chain.push(node);
                        work.push(Step::Leave(node));
                        // Neighbors come most-recent-first; pushing them in
                        // that order makes the LIFO pop visit declared order.
                        for dep in self.graph.neighbors_directed(node, Direction::Outgoing) {
                            work.push(Step::Enter(dep));
                        }
                    }
                },
                Step::Leave(node) => {
                    marks[node.index()] = Mark::Done;
                    chain.pop();
                }
            }
        }
        None
    }

    /// Deterministic topological order over the whole graph: every
    /// dependency precedes its dependents, and independent subgraphs follow
    /// registration order.
    ///
    /// Fails with the cycle path if the graph is not acyclic.
    pub fn topological_sort(&self) -> Result<Vec<TestKey>> {
        self.validate_acyclic()?;
        let mut visited = vec![false; self.graph.node_count()];
        let mut order: Vec<NodeIndex> = Vec::with_capacity(self.graph.node_count());
        for start in self.graph.node_indices() {
            self.post_order_from(start, &mut visited, &mut order);
        }
        Ok(order.into_iter().map(|n| self.graph[n].clone()).collect())
    }

    /// Execution order for one task: its transitive dependencies in
    /// post-order, the task itself last. Unreachable tasks do not appear.
    ///
    /// Fails with the cycle path when the reachable subgraph is cyclic, or
    /// with [`TestdagError::TestNotFound`] for an unknown key.
    pub fn execution_order(&self, key: &TestKey) -> Result<Vec<TestKey>> {
        let Some(&start) = self.nodes.get(key) else {
            return Err(TestdagError::TestNotFound(key.to_string()));
        };
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
        if let Some(path) = self.find_cycle_from(start, &mut marks) {
            return Err(TestdagError::Cycle { path });
        }
        let mut visited = vec![false; self.graph.node_count()];
        let mut order: Vec<NodeIndex> = Vec::new();
        self.post_order_from(start, &mut visited, &mut order);
        Ok(order.into_iter().map(|n| self.graph[n].clone()).collect())
    }

    /// Iterative post-order DFS along dependency edges. Assumes the
    /// reachable subgraph is already known to be acyclic.
    fn post_order_from(
        &self,
        start: NodeIndex,
        visited: &mut [bool],
        order: &mut Vec<NodeIndex>,
    ) {
        let mut work: Vec<Step> = vec![Step::Enter(start)];
        while let Some(step) = work.pop() {
            match step {
                Step::Enter(node) => {
                    if visited[node.index()] {
                        continue;
                    }
                    visited[node.index()] = true;
                    work.push(Step::Leave(node));
                    for dep in self.graph.neighbors_directed(node, Direction::Outgoing) {
                        work.push(Step::Enter(dep));
                    }
                }
                Step::Leave(node) => order.push(node),
            }
        }
    }
}
