// src/dag/state.rs

//! Per-run bookkeeping for the scheduler.
//!
//! Built fresh for every run and dropped when the run ends. Shared between
//! the scheduler and the node workers behind a single mutex that is only
//! held for check-and-mark / decrement, never across a node's execution.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use tracing::trace;

/// Which nodes take part in a run.
#[derive(Debug, Clone)]
pub(crate) enum Eligibility {
    All,
    Only(HashSet<NodeIndex>),
}

impl Eligibility {
    pub(crate) fn contains(&self, idx: NodeIndex) -> bool {
        match self {
            Eligibility::All => true,
            Eligibility::Only(set) => set.contains(&idx),
        }
    }
}

#[derive(Debug)]
pub(crate) struct ExecutionState {
    /// Eligible nodes in registration order; scans follow this order.
    order: Vec<NodeIndex>,
    /// Incoming edges from eligible, not-yet-completed nodes.
    in_degree: HashMap<NodeIndex, usize>,
    /// Eligible dependents per node, one entry per edge.
    dependents: HashMap<NodeIndex, Vec<NodeIndex>>,
    completed: HashSet<NodeIndex>,
}

impl ExecutionState {
    pub(crate) fn build<N, E>(graph: &DiGraph<N, E>, eligible: &Eligibility) -> Self {
        let order: Vec<NodeIndex> = graph
            .node_indices()
            .filter(|&idx| eligible.contains(idx))
            .collect();

        let mut in_degree: HashMap<NodeIndex, usize> =
            order.iter().map(|&idx| (idx, 0)).collect();
        let mut dependents: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();

        for edge in graph.raw_edges() {
            let (left, right) = (edge.source(), edge.target());
            if eligible.contains(left) && eligible.contains(right) {
                *in_degree.entry(right).or_default() += 1;
                dependents.entry(left).or_default().push(right);
            }
        }

        Self {
            order,
            in_degree,
            dependents,
            completed: HashSet::new(),
        }
    }

    /// Eligible nodes that have not run yet and have no pending dependency.
    pub(crate) fn ready(&self) -> Vec<NodeIndex> {
        self.order
            .iter()
            .copied()
            .filter(|idx| !self.completed.contains(idx) && self.in_degree.get(idx) == Some(&0))
            .collect()
    }

    /// Eligible nodes that have not completed, in registration order.
    pub(crate) fn remaining(&self) -> Vec<NodeIndex> {
        self.order
            .iter()
            .copied()
            .filter(|idx| !self.completed.contains(idx))
            .collect()
    }

    /// Record that `idx` ran and release one dependency of each dependent.
    pub(crate) fn mark_complete(&mut self, idx: NodeIndex) {
        if !self.completed.insert(idx) {
            return;
        }
        if let Some(deps) = self.dependents.get(&idx) {
            for dep in deps {
                if let Some(count) = self.in_degree.get_mut(dep) {
                    *count = count.saturating_sub(1);
                    trace!(node = dep.index(), remaining = *count, "released dependency");
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn in_degree_of(&self, idx: NodeIndex) -> Option<usize> {
        self.in_degree.get(&idx).copied()
    }
}
