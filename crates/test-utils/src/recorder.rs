use std::sync::Arc;

use parking_lot::Mutex;
use tdag::{NodeReport, Reporter, RunMode, RunReport};

/// Something a [`RecordingReporter`] saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    RunStarted { mode: RunMode, eligible: usize },
    NodeStarted { id: String, wave: usize },
    NodeFinished { id: String, passed: bool },
    RunFinished { executed: usize },
    Log { node: Option<String>, message: String },
}

/// Reporter that records every callback, for assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<Event>>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn started_nodes(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::NodeStarted { id, .. } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Logged lines as `(node, message)`, in the order they arrived.
    pub fn logs(&self) -> Vec<(Option<String>, String)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Log { node, message } => Some((node.clone(), message.clone())),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn run_started(&self, mode: &RunMode, eligible: usize) {
        self.events.lock().push(Event::RunStarted {
            mode: mode.clone(),
            eligible,
        });
    }

    fn node_started(&self, id: &str, wave: usize) {
        self.events.lock().push(Event::NodeStarted {
            id: id.to_string(),
            wave,
        });
    }

    fn node_finished(&self, report: &NodeReport) {
        self.events.lock().push(Event::NodeFinished {
            id: report.id.clone(),
            passed: report.outcome.is_passed(),
        });
    }

    fn node_log(&self, node: Option<&str>, message: &str) {
        self.events.lock().push(Event::Log {
            node: node.map(str::to_string),
            message: message.to_string(),
        });
    }

    fn run_finished(&self, report: &RunReport) {
        self.events.lock().push(Event::RunFinished {
            executed: report.nodes.len(),
        });
    }
}

/// Shared, append-only log that node callbacks push into, so tests can
/// check the order in which things happened.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Position of the first occurrence of `entry`.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().iter().position(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }
}
