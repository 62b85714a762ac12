// src/dag/scheduler.rs

//! Wave-synchronous topological execution.
//!
//! `run_all` and `run_to` share one routine and differ only in the set of
//! eligible nodes:
//!
//! 1. build in-degrees and dependents for the eligible nodes;
//! 2. run setup hooks;
//! 3. collect every ready node (in-degree zero, not yet run) into a wave;
//!    an empty wave with nodes still outstanding is a deadlock;
//! 4. run the wave, one blocking task per node, and wait for all of it;
//! 5. repeat until nothing is left, then run teardown hooks.
//!
//! Nothing from wave N+1 starts before every node of wave N has finished.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use petgraph::graph::NodeIndex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn};

use crate::context::{NodeScope, TestContext};
use crate::dag::closure::dependency_closure;
use crate::dag::graph::{Dag, Node};
use crate::dag::hooks::{self, CallFailure, Hook, catch_panic, guarded};
use crate::dag::state::{Eligibility, ExecutionState};
use crate::errors::{HookPhase, Result, TdagError};
use crate::report::{NodeOutcome, NodeReport, RunMode, RunReport};

impl<C> Dag<C>
where
    C: Send + Sync + 'static,
{
    /// Run every node, dependencies first.
    pub async fn run_all(&self) -> Result<RunReport> {
        self.execute(RunMode::All, Eligibility::All).await
    }

    /// Run `target` and everything it transitively depends on, and nothing
    /// else.
    ///
    /// An unknown target fails immediately; no hook or node runs.
    pub async fn run_to(&self, target: &str) -> Result<RunReport> {
        let idx = self.lookup(target).inspect_err(|_| {
            error!(node = target, "run target does not exist");
        })?;
        let closure = dependency_closure(&self.graph, idx);
        debug!(node = target, nodes = closure.len(), "resolved dependency closure");
        self.execute(RunMode::To(target.to_string()), Eligibility::Only(closure))
            .await
    }

    async fn execute(&self, mode: RunMode, eligible: Eligibility) -> Result<RunReport> {
        let ctx = self.context.as_ref();
        let state = ExecutionState::build(&self.graph, &eligible);
        let eligible_count = state.remaining().len();
        let state = Arc::new(Mutex::new(state));

        ctx.reporter().run_started(&mode, eligible_count);

        hooks::run_until_failure(HookPhase::Setup, &self.hooks.setup, ctx).map_err(|failure| {
            TdagError::HookFailed {
                phase: HookPhase::Setup,
                message: failure.message().to_string(),
            }
        })?;

        let mut report = RunReport::new(mode);

        for wave in 0.. {
            let ready = state.lock().ready();

            if ready.is_empty() {
                let remaining = state.lock().remaining();
                if remaining.is_empty() {
                    break;
                }
                let remaining = self.ids_of(&remaining);
                error!(?remaining, "no runnable node left; dependency cycle detected");
                return Err(TdagError::DependencyDeadlock { remaining });
            }

            let ids = self.ids_of(&ready);
            info!(wave, nodes = ?ids, "dispatching wave");
            report.waves.push(ids);

            let mut workers = JoinSet::new();
            for idx in ready {
                let job = NodeJob {
                    idx,
                    node: self.graph[idx].clone(),
                    wave,
                    ctx: Arc::clone(&self.context),
                    before_each: self.hooks.before_each.clone(),
                    after_each: self.hooks.after_each.clone(),
                    state: Arc::clone(&state),
                };
                workers.spawn_blocking(move || job.run());
            }

            // Barrier: the whole wave finishes before the next one is computed,
            // even when a worker died.
            let mut lost = Vec::new();
            while let Some(joined) = workers.join_next().await {
                match joined {
                    Ok(node_report) => report.nodes.push(node_report),
                    Err(e) => {
                        error!(wave, error = %e, "node worker did not finish");
                        lost.push(e);
                    }
                }
            }
            if let Some(first) = lost.into_iter().next() {
                let failures =
                    hooks::run_all_collecting(HookPhase::Teardown, &self.hooks.teardown, ctx);
                debug!(teardown_failures = failures.len(), "ran teardown after losing a worker");
                return Err(TdagError::Other(
                    anyhow::Error::new(first).context("node worker did not finish"),
                ));
            }
            debug!(wave, "wave complete");
        }

        report.hook_failures = hooks::run_all_collecting(HookPhase::Teardown, &self.hooks.teardown, ctx);

        ctx.reporter().run_finished(&report);
        Ok(report)
    }

    fn ids_of(&self, indices: &[NodeIndex]) -> Vec<String> {
        indices.iter().map(|&i| self.graph[i].id().to_string()).collect()
    }
}

/// Everything one worker thread needs to run a single node.
struct NodeJob<C> {
    idx: NodeIndex,
    node: Node<C>,
    wave: usize,
    ctx: Arc<TestContext<C>>,
    before_each: Vec<Hook<C>>,
    after_each: Vec<Hook<C>>,
    state: Arc<Mutex<ExecutionState>>,
}

impl<C> NodeJob<C> {
    fn run(self) -> NodeReport {
        let id = self.node.id().to_string();
        let span = info_span!("node", id = %id, wave = self.wave);
        let _enter = span.enter();

        let ctx = self.ctx.as_ref();
        let scope = NodeScope::enter(&id);
        let started = Instant::now();

        let announced = catch_panic(|| ctx.reporter().node_started(&id, self.wave));

        let before = hooks::run_until_failure(HookPhase::BeforeEach, &self.before_each, ctx);
        let body = match before {
            Ok(()) => guarded(|| self.node.call(ctx)),
            Err(failure) => Err(CallFailure::Error(format!(
                "before-each hook failed: {}",
                failure.message()
            ))),
        };
        let after = hooks::run_until_failure(HookPhase::AfterEach, &self.after_each, ctx);

        let mut outcome = match (body, after) {
            (Ok(()), Ok(())) => NodeOutcome::Passed,
            (Ok(()), Err(failure)) => {
                NodeOutcome::Failed(format!("after-each hook failed: {}", failure.message()))
            }
            (Err(CallFailure::Error(msg)), _) => NodeOutcome::Failed(msg),
            (Err(CallFailure::Panic(msg)), _) => NodeOutcome::Panicked(msg),
        };
        if let Err(msg) = announced {
            warn!(node = %id, panic = %msg, "reporter panicked in node_started");
            if outcome.is_passed() {
                outcome = NodeOutcome::Panicked(format!("reporter panicked in node_started: {msg}"));
            }
        }

        let mut report = NodeReport {
            id,
            wave: self.wave,
            outcome,
            duration: started.elapsed(),
            logs: scope.finish(),
        };
        if let Err(msg) = catch_panic(|| ctx.reporter().node_finished(&report)) {
            warn!(node = %report.id, panic = %msg, "reporter panicked in node_finished");
            if report.outcome.is_passed() {
                report.outcome =
                    NodeOutcome::Panicked(format!("reporter panicked in node_finished: {msg}"));
            }
        }

        // Completion means "ran": dependents are released whatever the outcome.
        self.state.lock().mark_complete(self.idx);
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn residual_cycle_is_fatal_and_skips_teardown() {
        let torn_down = Arc::new(AtomicUsize::new(0));
        let mut dag = Dag::new();
        for id in ["a", "b", "c"] {
            dag.add_node(id, |_| Ok(())).unwrap();
        }
        let counter = Arc::clone(&torn_down);
        dag.teardown(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        // Force a loop past the insertion-time check.
        let a = dag.lookup("a").unwrap();
        let b = dag.lookup("b").unwrap();
        dag.graph.add_edge(a, b, ());
        dag.graph.add_edge(b, a, ());

        match dag.run_all().await {
            Err(TdagError::DependencyDeadlock { remaining }) => {
                assert_eq!(remaining, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected DependencyDeadlock, got {other:?}"),
        }
        assert_eq!(torn_down.load(Ordering::SeqCst), 0);
    }
}
