// src/dag/closure.rs

use std::collections::HashSet;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};

/// The target plus every node it transitively depends on.
///
/// Walks the reversed edge relation from `target`. Terminates because the
/// graph never holds a cycle.
pub(crate) fn dependency_closure<N, E>(graph: &DiGraph<N, E>, target: NodeIndex) -> HashSet<NodeIndex> {
    let reversed = Reversed(graph);
    let mut dfs = Dfs::new(reversed, target);
    let mut collected = HashSet::new();
    while let Some(idx) = dfs.next(reversed) {
        collected.insert(idx);
    }
    collected
}
