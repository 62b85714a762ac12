// src/lib.rs

//! Dependency-graph test execution.
//!
//! Tests are registered as named nodes of a [`Dag`], with edges saying which
//! test has to finish before another may start. A run executes the graph in
//! waves: every node whose dependencies have completed runs concurrently
//! with the rest of its wave, and the next wave starts only when the whole
//! current one is done. [`Dag::run_to`] restricts a run to one target and
//! its transitive dependencies.
//!
//! Callbacks share a [`TestContext`] whose [`Store`] lets one test publish a
//! value for a later one.

pub mod cli;
pub mod config;
pub mod context;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod export;
pub mod logging;
pub mod report;
pub mod store;

use std::io::Write;
use std::process::ExitCode;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command, GraphArgs, RunArgs};
use crate::config::{ConfigFile, load_and_validate};
use crate::exec::build_dag;

pub use crate::context::TestContext;
pub use crate::dag::{Dag, Edge};
pub use crate::errors::{HookPhase, TdagError};
pub use crate::report::{
    HookFailure, LogReporter, NodeOutcome, NodeReport, Reporter, RunMode, RunReport,
};
pub use crate::store::Store;

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the config, then dispatches to the subcommand.
pub async fn run(args: CliArgs) -> Result<ExitCode> {
    info!(config = %args.config.display(), "using config");
    let cfg = load_and_validate(&args.config)?;

    match args.command {
        Command::Run(run_args) => run_tests(&cfg, &run_args).await,
        Command::Graph(graph_args) => export_graph(&cfg, &graph_args),
    }
}

async fn run_tests(cfg: &ConfigFile, args: &RunArgs) -> Result<ExitCode> {
    let dag = build_dag(cfg, TestContext::empty())?;

    if args.dry_run {
        print_dry_run(&dag, args.to.as_deref())?;
        return Ok(ExitCode::SUCCESS);
    }

    let report = match args.to.as_deref() {
        Some(target) => dag.run_to(target).await?,
        None => dag.run_all().await?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn export_graph(cfg: &ConfigFile, args: &GraphArgs) -> Result<ExitCode> {
    let dag = build_dag(cfg, TestContext::empty())?;

    if args.out.as_os_str() == "-" {
        let mut stdout = std::io::stdout().lock();
        export::write_d2(&dag, &mut stdout)?;
        stdout.flush()?;
    } else {
        dag.to_d2(&args.out)?;
        info!(path = %args.out.display(), "wrote D2 graph");
    }
    Ok(ExitCode::SUCCESS)
}

/// Print the nodes (optionally restricted to a target's closure) and edges
/// without running anything.
fn print_dry_run(dag: &Dag, target: Option<&str>) -> Result<()> {
    println!("tdag dry-run");

    let nodes = match target {
        Some(t) => dag.dependency_closure(t)?,
        None => dag.node_ids().collect(),
    };

    println!("nodes ({}):", nodes.len());
    for id in &nodes {
        println!("  - {id}");
    }

    println!("edges:");
    for (left, right) in dag.edges() {
        if nodes.contains(&left) && nodes.contains(&right) {
            println!("  {left} -> {right}");
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

fn print_summary(report: &RunReport) {
    for node in &report.nodes {
        let (tag, detail) = match &node.outcome {
            NodeOutcome::Passed => ("PASS", None),
            NodeOutcome::Failed(msg) => ("FAIL", Some(msg)),
            NodeOutcome::Panicked(msg) => ("PANIC", Some(msg)),
        };
        println!(
            "{tag:<5} {} (wave {}, {} ms)",
            node.id,
            node.wave,
            node.duration.as_millis()
        );
        for line in &node.logs {
            println!("      | {line}");
        }
        if let Some(detail) = detail {
            println!("      {detail}");
        }
    }
    for failure in &report.hook_failures {
        println!("HOOK  {} failed: {}", failure.phase, failure.message);
    }

    let failed = report.failed().count();
    println!(
        "\n{} nodes in {} waves: {} passed, {} failed",
        report.nodes.len(),
        report.waves.len(),
        report.nodes.len() - failed,
        failed
    );
}
