// src/dag/mod.rs

//! DAG representation and scheduling.
//!
//! - [`graph`] holds the nodes, edges, shared context and hooks.
//! - `cycle` rejects edges that would close a loop.
//! - `closure` computes the dependency closure used by `run_to`.
//! - `hooks` holds setup / teardown / before-each / after-each callbacks.
//! - `state` is the per-run in-degree and completion bookkeeping.
//! - `scheduler` runs the graph wave by wave (`Dag::run_all`, `Dag::run_to`).

mod closure;
mod cycle;
pub mod graph;
mod hooks;
mod scheduler;
mod state;

pub use graph::{Dag, Edge, Node, NodeFn};
