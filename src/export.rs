// src/export.rs

//! Edge-list export in [D2](https://d2lang.com) syntax.
//!
//! One `left -> right` line per edge. Nodes are visited in registration
//! order; from each node not yet reached we walk depth-first along outgoing
//! edges in insertion order, so every edge is emitted exactly once.

use std::collections::HashSet;
use std::io::Write;

use petgraph::Direction;

use crate::dag::Dag;
use crate::errors::Result;

/// Render `dag` as D2 text.
pub fn render_d2<C>(dag: &Dag<C>) -> String {
    let mut out = String::new();
    let mut expanded: HashSet<&str> = HashSet::new();
    let mut printed: HashSet<(&str, &str)> = HashSet::new();

    for id in dag.node_ids() {
        visit(dag, id, &mut expanded, &mut printed, &mut out);
    }
    out
}

/// Render `dag` as D2 text into `writer`.
pub fn write_d2<C, W: Write>(dag: &Dag<C>, writer: &mut W) -> Result<()> {
    writer.write_all(render_d2(dag).as_bytes())?;
    Ok(())
}

fn visit<'a, C>(
    dag: &'a Dag<C>,
    id: &'a str,
    expanded: &mut HashSet<&'a str>,
    printed: &mut HashSet<(&'a str, &'a str)>,
    out: &mut String,
) {
    if !expanded.insert(id) {
        return;
    }
    let Ok(idx) = dag.lookup(id) else {
        return;
    };

    for next in dag.neighbours_in_order(idx, Direction::Outgoing) {
        if printed.insert((id, next)) {
            out.push_str(id);
            out.push_str(" -> ");
            out.push_str(next);
            out.push('\n');
        }
        visit(dag, next, expanded, printed, out);
    }
}
