//! Shared helpers for `tdag` tests.
//!
//! - [`init_tracing`] installs a test-captured subscriber once per binary.
//! - [`with_timeout`] bounds a whole run so a scheduling bug fails the test
//!   instead of hanging it.
//! - [`recording_dag`] builds a graph from an edge list whose nodes only
//!   record that they ran.

pub mod builders;
pub mod recorder;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tdag::Dag;
use tracing_subscriber::EnvFilter;

use crate::recorder::ExecutionLog;

/// Upper bound for one test run. Waves in tests sleep or rendezvous for at
/// most a few hundred milliseconds, so anything near this is a hang.
pub const RUN_TIMEOUT: Duration = Duration::from_secs(10);

static INIT: Once = Once::new();

/// Install a subscriber writing through the test harness.
///
/// Filtered by `TDAG_LOG` (same syntax as the binary, e.g.
/// `TDAG_LOG=tdag::node=debug cargo test`), defaulting to `warn` so passing
/// runs stay quiet.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(tdag::logging::LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        // A test binary may already have a global subscriber; keep it.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_names(true)
            .try_init();
    });
}

/// Await `f`, panicking if it takes longer than [`RUN_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(RUN_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("run did not finish within {RUN_TIMEOUT:?}; scheduler stalled?"),
    }
}

/// Register a node that pushes its own id into `log` when it runs.
pub fn recording_node<C>(dag: &mut Dag<C>, id: &str, log: &ExecutionLog)
where
    C: Send + Sync + 'static,
{
    let log = log.clone();
    let name = id.to_string();
    dag.add_node(id, move |_| {
        log.push(name.clone());
        Ok(())
    })
    .expect("node ids in a test graph are unique");
}

/// Build a graph of recording nodes, registered in `ids` order, with one
/// edge per `(left, right)` pair, inserted in order.
pub fn recording_dag<S: AsRef<str>>(ids: &[S], edges: &[(S, S)], log: &ExecutionLog) -> Dag {
    let mut dag = Dag::new();
    for id in ids {
        recording_node(&mut dag, id.as_ref(), log);
    }
    for (left, right) in edges {
        dag.add_edge(left.as_ref(), [right.as_ref()])
            .expect("test graph edges are acyclic");
    }
    dag
}
