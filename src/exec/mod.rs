// src/exec/mod.rs

//! Turning a validated config into a runnable [`Dag`].
//!
//! - [`command`] builds node callbacks that run each test's shell command
//!   and publish its stdout to the shared store.

pub mod command;

use tracing::debug;

use crate::config::ConfigFile;
use crate::context::TestContext;
use crate::dag::Dag;
use crate::errors::Result;

pub use command::{CommandSpec, command_node, output_env_var, run_command, stdout_key};

/// Build a DAG with one command node per test and one edge per `after`
/// entry, using the given context.
///
/// Fails with `CycleRejected` if the `after` references form a loop.
pub fn build_dag<C: 'static>(cfg: &ConfigFile, context: TestContext<C>) -> Result<Dag<C>> {
    let mut dag = Dag::with_context(context);

    for test in cfg.tests() {
        dag.add_node(test.id.clone(), command_node(CommandSpec::from(&test)))?;
    }
    for test in cfg.tests() {
        for dep in &test.after {
            dag.add_edge(dep, [test.id.as_str()])?;
        }
    }

    debug!(nodes = dag.len(), edges = dag.edge_count(), "built DAG from config");
    Ok(dag)
}
