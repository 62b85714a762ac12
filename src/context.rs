// src/context.rs

//! Execution context shared by every callback of a DAG.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use crate::report::{LogReporter, Reporter};
use crate::store::Store;

/// Node currently running on this thread, with the lines it has logged.
struct ActiveNode {
    id: String,
    lines: Vec<String>,
}

thread_local! {
    static ACTIVE_NODE: RefCell<Option<ActiveNode>> = const { RefCell::new(None) };
}

/// Attributes [`TestContext::log`] calls on this thread to one node until
/// it is finished or dropped.
///
/// Only the thread that entered the scope is covered; lines logged from
/// threads a callback spawns itself are reported without a node.
pub(crate) struct NodeScope {
    _private: (),
}

impl NodeScope {
    pub(crate) fn enter(id: &str) -> Self {
        ACTIVE_NODE.with(|active| {
            *active.borrow_mut() = Some(ActiveNode {
                id: id.to_string(),
                lines: Vec::new(),
            });
        });
        Self { _private: () }
    }

    /// Leave the scope, returning every line logged inside it.
    pub(crate) fn finish(self) -> Vec<String> {
        ACTIVE_NODE
            .with(|active| active.borrow_mut().take())
            .map(|node| node.lines)
            .unwrap_or_default()
    }
}

impl Drop for NodeScope {
    fn drop(&mut self) {
        ACTIVE_NODE.with(|active| active.borrow_mut().take());
    }
}

/// One instance per [`Dag`](crate::dag::Dag), borrowed by every hook and
/// node callback during a run.
///
/// `C` is free-form user state (defaults to `()`); anything that needs to
/// change during a run should live in the [`Store`] or use its own interior
/// mutability, since callbacks only get `&TestContext<C>`.
pub struct TestContext<C = ()> {
    store: Store,
    reporter: Arc<dyn Reporter>,
    state: C,
}

impl TestContext<()> {
    pub fn empty() -> Self {
        Self::new(())
    }
}

impl<C> TestContext<C> {
    pub fn new(state: C) -> Self {
        Self {
            store: Store::new(),
            reporter: Arc::new(LogReporter),
            state,
        }
    }

    /// Replace the default [`LogReporter`].
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn state(&self) -> &C {
        &self.state
    }

    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    /// Log a line from inside a callback.
    ///
    /// The line goes to the reporter. When called on a node's thread (its
    /// callback or its before-each / after-each hooks) it is attributed to
    /// that node and also ends up in [`NodeReport::logs`](crate::report::NodeReport).
    /// Setup and teardown lines are reported without a node.
    pub fn log(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        let node = ACTIVE_NODE.with(|active| {
            active.borrow_mut().as_mut().map(|node| {
                node.lines.push(message.to_string());
                node.id.clone()
            })
        });
        self.reporter.node_log(node.as_deref(), message);
    }
}

impl<C: fmt::Debug> fmt::Debug for TestContext<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestContext")
            .field("store", &self.store)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_attributed_only_inside_a_scope() {
        let ctx = TestContext::empty();
        ctx.log("before any node");

        let scope = NodeScope::enter("s.a");
        ctx.log("one");
        ctx.log(String::from("two"));
        assert_eq!(scope.finish(), vec!["one", "two"]);

        ctx.log("after the node");
        let scope = NodeScope::enter("s.b");
        assert!(scope.finish().is_empty());
    }

    #[test]
    fn dropping_a_scope_clears_it() {
        let ctx = TestContext::empty();
        {
            let _scope = NodeScope::enter("s.a");
            ctx.log("lost");
        }
        let scope = NodeScope::enter("s.b");
        ctx.log("kept");
        assert_eq!(scope.finish(), vec!["kept"]);
    }
}
