mod common;
use crate::common::{ExecutionLog, RecordingReporter, init_tracing, recording_node, with_timeout};

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tdag::{Dag, RunMode, TdagError, TestContext};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn run_to_stops_at_the_target() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = ExecutionLog::new();
        let mut dag = Dag::new();
        for id in ["a", "b", "c"] {
            recording_node(&mut dag, id, &log);
        }
        dag.add_edge("a", ["b"])?;
        dag.add_edge("b", ["c"])?;

        let report = dag.run_to("b").await?;

        assert_eq!(report.mode, RunMode::To("b".into()));
        assert_eq!(log.entries(), vec!["a", "b"]);
        assert_eq!(log.count("c"), 0);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn run_to_ignores_unrelated_branches() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = ExecutionLog::new();
        let mut dag = Dag::new();
        for id in ["root", "left", "right", "leaf", "other"] {
            recording_node(&mut dag, id, &log);
        }
        dag.add_edge("root", ["left", "right"])?;
        dag.add_edge("left", ["leaf"])?;

        let report = dag.run_to("leaf").await?;

        let mut executed = report.executed();
        executed.sort();
        assert_eq!(executed, vec!["leaf", "left", "root"]);
        assert_eq!(
            report.waves,
            vec![
                vec!["root".to_string()],
                vec!["left".to_string()],
                vec!["leaf".to_string()],
            ]
        );
        Ok(())
    })
    .await
}

#[tokio::test]
async fn run_to_a_root_runs_only_the_root() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = ExecutionLog::new();
        let mut dag = Dag::new();
        recording_node(&mut dag, "a", &log);
        recording_node(&mut dag, "b", &log);
        dag.add_edge("a", ["b"])?;

        dag.run_to("a").await?;
        assert_eq!(log.entries(), vec!["a"]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn unknown_target_fails_before_anything_runs() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = ExecutionLog::new();
        let setups = Arc::new(AtomicUsize::new(0));
        let reporter = RecordingReporter::new();
        let mut dag = Dag::with_context(TestContext::empty().with_reporter(reporter.clone()));
        recording_node(&mut dag, "a", &log);
        let s = Arc::clone(&setups);
        dag.setup(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        match dag.run_to("missing").await {
            Err(TdagError::UnknownNode(id)) => assert_eq!(id, "missing"),
            other => panic!("expected UnknownNode, got {other:?}"),
        }
        assert_eq!(setups.load(Ordering::SeqCst), 0);
        assert!(log.entries().is_empty());
        assert!(reporter.events().is_empty());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn hooks_run_around_a_partial_run() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = ExecutionLog::new();
        let mut dag = Dag::new();
        recording_node(&mut dag, "a", &log);
        recording_node(&mut dag, "b", &log);
        recording_node(&mut dag, "unrelated", &log);
        dag.add_edge("a", ["b"])?;

        let l = log.clone();
        dag.setup(move |_| {
            l.push("setup");
            Ok(())
        });
        let l = log.clone();
        dag.teardown(move |_| {
            l.push("teardown");
            Ok(())
        });
        let each = Arc::new(AtomicUsize::new(0));
        let e = Arc::clone(&each);
        dag.before_each(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        dag.run_to("b").await?;

        assert_eq!(log.entries(), vec!["setup", "a", "b", "teardown"]);
        assert_eq!(each.load(Ordering::SeqCst), 2);
        Ok(())
    })
    .await
}

/// Mirrors a typical API suite: accounts, sessions, then tag management.
fn kitchensink(log: &ExecutionLog) -> Result<Dag, TdagError> {
    let mut dag = Dag::new();
    let ids = [
        "accounts.register",
        "accounts.confirm",
        "session.login",
        "session.refresh",
        "components.tags.list",
        "components.tags.create",
        "components.tags.delete",
        "admin.audit",
    ];
    for id in ids {
        recording_node(&mut dag, id, log);
    }
    dag.add_edge("accounts.register", ["accounts.confirm"])?;
    dag.add_edge("accounts.confirm", ["session.login"])?;
    dag.add_edge("session.login", ["session.refresh", "components.tags.list"])?;
    dag.add_edge("components.tags.list", ["components.tags.create"])?;
    dag.add_edge("components.tags.create", ["components.tags.delete"])?;
    dag.add_edge("session.login", ["admin.audit"])?;
    Ok(dag)
}

#[tokio::test]
async fn kitchensink_run_to_executes_the_closure_in_order() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = ExecutionLog::new();
        let dag = kitchensink(&log)?;

        let expected = dag.dependency_closure("components.tags.create")?;
        assert_eq!(
            expected,
            vec![
                "accounts.register",
                "accounts.confirm",
                "session.login",
                "components.tags.list",
                "components.tags.create",
            ]
        );

        dag.run_to("components.tags.create").await?;

        // a straight chain, so completion order is fully determined
        assert_eq!(log.entries(), expected);
        for skipped in ["session.refresh", "components.tags.delete", "admin.audit"] {
            assert_eq!(log.count(skipped), 0, "{skipped} should not run");
        }
        Ok(())
    })
    .await
}

#[tokio::test]
async fn repeated_runs_start_from_scratch() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = ExecutionLog::new();
        let dag = kitchensink(&log)?;

        dag.run_to("session.login").await?;
        dag.run_all().await?;

        assert_eq!(log.count("session.login"), 2);
        assert_eq!(log.count("admin.audit"), 1);
        Ok(())
    })
    .await
}
