// src/report.rs

//! Per-node and per-run results, and the [`Reporter`] hook that observes
//! them while a run is in progress.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::HookPhase;

/// Which entry point started a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "target")]
pub enum RunMode {
    /// `run_all`: every node in the graph.
    All,
    /// `run_to(target)`: the target plus its transitive dependencies.
    To(String),
}

/// What happened when a node ran.
///
/// Completion means "ran", not "passed": dependents of a failed node still
/// become eligible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "message")]
pub enum NodeOutcome {
    Passed,
    Failed(String),
    Panicked(String),
}

impl NodeOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, NodeOutcome::Passed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    pub id: String,
    /// Zero-based index of the wave the node ran in.
    pub wave: usize,
    pub outcome: NodeOutcome,
    pub duration: Duration,
    /// Lines the node logged through [`TestContext::log`](crate::context::TestContext::log).
    pub logs: Vec<String>,
}

/// A setup/teardown hook that returned an error without aborting the run.
#[derive(Debug, Clone, Serialize)]
pub struct HookFailure {
    pub phase: HookPhase,
    pub message: String,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    /// Node ids per wave, in the order each wave was dispatched.
    pub waves: Vec<Vec<String>>,
    /// Node reports in completion order.
    pub nodes: Vec<NodeReport>,
    pub hook_failures: Vec<HookFailure>,
}

impl RunReport {
    pub(crate) fn new(mode: RunMode) -> Self {
        Self {
            mode,
            waves: Vec::new(),
            nodes: Vec::new(),
            hook_failures: Vec::new(),
        }
    }

    /// Ids of every node that ran, in completion order.
    pub fn executed(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    pub fn passed(&self) -> impl Iterator<Item = &NodeReport> {
        self.nodes.iter().filter(|n| n.outcome.is_passed())
    }

    pub fn failed(&self) -> impl Iterator<Item = &NodeReport> {
        self.nodes.iter().filter(|n| !n.outcome.is_passed())
    }

    pub fn outcome_of(&self, id: &str) -> Option<&NodeOutcome> {
        self.nodes.iter().find(|n| n.id == id).map(|n| &n.outcome)
    }

    /// True when every node passed and no teardown hook failed.
    pub fn is_success(&self) -> bool {
        self.failed().next().is_none() && self.hook_failures.is_empty()
    }
}

/// Observer for run progress.
///
/// Called from the scheduler (run-level events) and from worker threads
/// (node-level events), so implementations must be thread-safe. Every
/// method defaults to doing nothing.
pub trait Reporter: Send + Sync {
    fn run_started(&self, _mode: &RunMode, _eligible: usize) {}
    fn node_started(&self, _id: &str, _wave: usize) {}
    fn node_finished(&self, _report: &NodeReport) {}
    fn run_finished(&self, _report: &RunReport) {}

    /// A line logged by a callback. `node` is `None` for setup and teardown
    /// hooks.
    fn node_log(&self, _node: Option<&str>, _message: &str) {}
}

/// Default reporter: writes everything to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn run_started(&self, mode: &RunMode, eligible: usize) {
        info!(?mode, eligible, "starting DAG run");
    }

    fn node_started(&self, id: &str, wave: usize) {
        debug!(node = %id, wave, "node started");
    }

    fn node_finished(&self, report: &NodeReport) {
        match &report.outcome {
            NodeOutcome::Passed => info!(
                node = %report.id,
                wave = report.wave,
                elapsed = ?report.duration,
                "node passed"
            ),
            NodeOutcome::Failed(msg) => warn!(
                node = %report.id,
                wave = report.wave,
                error = %msg,
                "node failed"
            ),
            NodeOutcome::Panicked(msg) => warn!(
                node = %report.id,
                wave = report.wave,
                panic = %msg,
                "node panicked"
            ),
        }
    }

    fn node_log(&self, node: Option<&str>, message: &str) {
        match node {
            Some(id) => info!(target: "tdag::node", node = %id, "{message}"),
            None => info!(target: "tdag::node", "{message}"),
        }
    }

    fn run_finished(&self, report: &RunReport) {
        info!(
            executed = report.nodes.len(),
            failed = report.failed().count(),
            waves = report.waves.len(),
            "DAG run finished"
        );
    }
}
