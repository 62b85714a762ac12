// src/dag/graph.rs

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::{debug, warn};

use crate::context::TestContext;
use crate::dag::closure::dependency_closure;
use crate::dag::cycle::find_cycle_path;
use crate::dag::hooks::{Hook, Hooks};
use crate::errors::{Result, TdagError};

/// Node callback: receives the shared context, returns `Err` to fail the node.
pub type NodeFn<C> = Arc<dyn Fn(&TestContext<C>) -> anyhow::Result<()> + Send + Sync>;

/// A uniquely named unit of test work.
pub struct Node<C> {
    id: String,
    callback: NodeFn<C>,
}

impl<C> Node<C> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn call(&self, ctx: &TestContext<C>) -> anyhow::Result<()> {
        (self.callback)(ctx)
    }
}

impl<C> Clone for Node<C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<C> fmt::Debug for Node<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Dependency constraint: `left` must complete before `right` starts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub left: String,
    pub right: String,
}

/// A graph of test nodes plus the context and hooks used to run them.
///
/// The graph can only be mutated through `&mut self`, and the run entry
/// points borrow `&self` for their whole duration, so the node and edge sets
/// are frozen while a run is in progress.
///
/// ```no_run
/// # async fn demo() -> tdag::errors::Result<()> {
/// use tdag::Dag;
///
/// let mut dag = Dag::new();
/// dag.setup(|ctx| {
///     ctx.store().set("email", String::from("test@example.com"));
///     Ok(())
/// });
/// dag.add_node("session.login", |ctx| {
///     let email: String = ctx.store().get("email")?;
///     ctx.log(format!("logging in as {email}"));
///     Ok(())
/// })?;
/// dag.add_node("session.logout", |_| Ok(()))?;
/// dag.add_edge("session.login", ["session.logout"])?;
///
/// let report = dag.run_all().await?;
/// assert!(report.is_success());
/// # Ok(())
/// # }
/// ```
pub struct Dag<C = ()> {
    pub(super) graph: DiGraph<Node<C>, ()>,
    index: HashMap<String, NodeIndex>,
    pub(super) context: Arc<TestContext<C>>,
    pub(super) hooks: Hooks<C>,
}

impl Dag<()> {
    pub fn new() -> Self {
        Self::with_context(TestContext::empty())
    }
}

impl Default for Dag<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Dag<C> {
    /// A DAG whose context carries `state`, reachable via `ctx.state()`.
    pub fn with_state(state: C) -> Self {
        Self::with_context(TestContext::new(state))
    }

    pub fn with_context(context: TestContext<C>) -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            context: Arc::new(context),
            hooks: Hooks::default(),
        }
    }

    pub fn context(&self) -> &TestContext<C> {
        &self.context
    }

    /// Register a node.
    ///
    /// Fails with [`TdagError::DuplicateNode`] if `id` is taken; the existing
    /// node is left untouched.
    pub fn add_node<F>(&mut self, id: impl Into<String>, callback: F) -> Result<()>
    where
        F: Fn(&TestContext<C>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.index.contains_key(&id) {
            warn!(node = %id, "rejecting duplicate node registration");
            return Err(TdagError::DuplicateNode(id));
        }

        let idx = self.graph.add_node(Node {
            id: id.clone(),
            callback: Arc::new(callback),
        });
        debug!(node = %id, "node registered");
        self.index.insert(id, idx);
        Ok(())
    }

    /// Add an edge from `from` to each of `to`, in order.
    ///
    /// Every edge is checked before insertion: both endpoints must exist and
    /// the edge must not close a cycle. The first failure is returned; edges
    /// inserted before it stay in place.
    pub fn add_edge<I, S>(&mut self, from: &str, to: I) -> Result<Vec<Edge>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let from_idx = self.lookup(from)?;
        let mut created = Vec::new();

        for target in to {
            let target = target.as_ref();
            let to_idx = self.lookup(target)?;

            if let Some(path) = find_cycle_path(&self.graph, from_idx, to_idx) {
                let path = std::iter::once(from_idx)
                    .chain(path)
                    .map(|i| self.graph[i].id.as_str())
                    .collect::<Vec<_>>()
                    .join(" -> ");
                warn!(from, to = target, %path, "rejecting edge that would close a cycle");
                return Err(TdagError::CycleRejected {
                    from: from.to_string(),
                    to: target.to_string(),
                    path,
                });
            }

            self.graph.add_edge(from_idx, to_idx, ());
            debug!(from, to = target, "edge added");
            created.push(Edge {
                left: from.to_string(),
                right: target.to_string(),
            });
        }

        Ok(created)
    }

    /// Run `hook` once, before any node of a run executes.
    pub fn setup<F>(&mut self, hook: F)
    where
        F: Fn(&TestContext<C>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.setup.push(Hook::new(hook));
    }

    /// Run `hook` once, after the last wave of a run.
    pub fn teardown<F>(&mut self, hook: F)
    where
        F: Fn(&TestContext<C>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.teardown.push(Hook::new(hook));
    }

    /// Run `hook` on the node's thread right before every node callback.
    pub fn before_each<F>(&mut self, hook: F)
    where
        F: Fn(&TestContext<C>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.before_each.push(Hook::new(hook));
    }

    /// Run `hook` on the node's thread right after every node callback.
    pub fn after_each<F>(&mut self, hook: F)
    where
        F: Fn(&TestContext<C>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.after_each.push(Hook::new(hook));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
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

    /// Node ids in registration order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(|n| n.id.as_str())
    }

    /// Edges in insertion order, as `(left, right)` ids.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.graph.raw_edges().iter().map(|e| {
            (
                self.graph[e.source()].id.as_str(),
                self.graph[e.target()].id.as_str(),
            )
        })
    }

    /// Immediate dependencies of `id` (left ends of edges into it).
    pub fn dependencies_of(&self, id: &str) -> Result<Vec<&str>> {
        let idx = self.lookup(id)?;
        Ok(self.neighbours_in_order(idx, Direction::Incoming))
    }

    /// Immediate dependents of `id` (right ends of edges out of it).
    pub fn dependents_of(&self, id: &str) -> Result<Vec<&str>> {
        let idx = self.lookup(id)?;
        Ok(self.neighbours_in_order(idx, Direction::Outgoing))
    }

    /// `id` and every node it transitively depends on, in registration order.
    pub fn dependency_closure(&self, id: &str) -> Result<Vec<&str>> {
        let idx = self.lookup(id)?;
        let closure = dependency_closure(&self.graph, idx);
        Ok(self
            .graph
            .node_indices()
            .filter(|i| closure.contains(i))
            .map(|i| self.graph[i].id.as_str())
            .collect())
    }

    /// Write the edge list in D2 syntax to `path`, replacing any existing file.
    pub fn to_d2(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, crate::export::render_d2(self))?;
        debug!(path = %path.display(), "wrote D2 graph");
        Ok(())
    }

    pub(crate) fn lookup(&self, id: &str) -> Result<NodeIndex> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| TdagError::UnknownNode(id.to_string()))
    }

    /// Neighbours of `idx` in edge insertion order, parallel edges collapsed.
    pub(crate) fn neighbours_in_order(&self, idx: NodeIndex, dir: Direction) -> Vec<&str> {
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(idx, dir)
            .map(|e| {
                let other = match dir {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (e.id(), other)
            })
            .collect();
        edges.sort_by_key(|(edge, _)| *edge);

        let mut out: Vec<&str> = Vec::with_capacity(edges.len());
        for (_, other) in edges {
            let id = self.graph[other].id.as_str();
            if !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }
}

impl<C> fmt::Debug for Dag<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dag")
            .field("nodes", &self.node_ids().collect::<Vec<_>>())
            .field("edges", &self.edges().collect::<Vec<_>>())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}
