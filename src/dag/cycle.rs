// src/dag/cycle.rs

//! Incremental cycle check run on every edge insertion.
//!
//! Adding `from -> to` closes a cycle iff `from == to` or `from` is already
//! reachable from `to`. We walk forward from `to` and, if we reach `from`,
//! return the route so the caller can show the user the loop.

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

/// Route `to -> ... -> from` along existing edges, if one exists.
///
/// A self-loop (`from == to`) yields `[from]`. The visited set is local to
/// the call, so repeated checks never see each other's markers. Runs in
/// O(V + E).
pub(crate) fn find_cycle_path<N, E>(
    graph: &DiGraph<N, E>,
    from: NodeIndex,
    to: NodeIndex,
) -> Option<Vec<NodeIndex>> {
    if from == to {
        return Some(vec![from]);
    }

    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut visited: HashSet<NodeIndex> = HashSet::from([to]);
    let mut stack = vec![to];

    while let Some(current) = stack.pop() {
        if current == from {
            let mut path = vec![from];
            let mut cursor = from;
            while let Some(&prev) = parent.get(&cursor) {
                path.push(prev);
                cursor = prev;
            }
            path.reverse();
            return Some(path);
        }

        for next in graph.neighbors_directed(current, Direction::Outgoing) {
            if visited.insert(next) {
                parent.insert(next, current);
                stack.push(next);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: usize) -> (DiGraph<(), ()>, Vec<NodeIndex>) {
        let mut g = DiGraph::new();
        let nodes: Vec<_> = (0..n).map(|_| g.add_node(())).collect();
        for w in nodes.windows(2) {
            g.add_edge(w[0], w[1], ());
        }
        (g, nodes)
    }

    #[test]
    fn back_edge_reports_full_route() {
        let (g, n) = chain(4);
        assert_eq!(find_cycle_path(&g, n[3], n[0]), Some(n.clone()));
    }

    #[test]
    fn forward_and_unrelated_edges_are_fine() {
        let (mut g, n) = chain(3);
        let lone = g.add_node(());
        assert_eq!(find_cycle_path(&g, n[0], n[2]), None);
        assert_eq!(find_cycle_path(&g, n[2], lone), None);
        assert_eq!(find_cycle_path(&g, lone, n[0]), None);
    }

    #[test]
    fn self_loop() {
        let (g, n) = chain(1);
        assert_eq!(find_cycle_path(&g, n[0], n[0]), Some(vec![n[0]]));
    }

    #[test]
    fn diamond_back_edge() {
        // a -> b, a -> c, b -> d, c -> d; adding d -> a must fail
        let mut g: DiGraph<(), ()> = DiGraph::new();
        let a = g.add_node(());
        let b = g.add_node(());
        let c = g.add_node(());
        let d = g.add_node(());
        g.add_edge(a, b, ());
        g.add_edge(a, c, ());
        g.add_edge(b, d, ());
        g.add_edge(c, d, ());

        let path = find_cycle_path(&g, d, a).expect("cycle");
        assert_eq!(path.first(), Some(&a));
        assert_eq!(path.last(), Some(&d));
        assert_eq!(path.len(), 3);
        assert_eq!(find_cycle_path(&g, b, c), None);
    }
}
