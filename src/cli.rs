// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_CONFIG_PATH;

/// Command-line arguments for `tdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tdag",
    version,
    about = "Get a wrangle on your tests and schedule them along their dependencies.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (YAML, JSON or TOML, by extension).
    #[arg(
        short,
        long,
        global = true,
        value_name = "PATH",
        default_value = DEFAULT_CONFIG_PATH
    )]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TDAG_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the configured tests in dependency order.
    Run(RunArgs),
    /// Write the dependency graph as a D2 edge list.
    Graph(GraphArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Only run this node (`scenario.test`) and what it depends on.
    #[arg(long, value_name = "NODE")]
    pub to: Option<String>,

    /// Parse + validate, print the graph, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report as JSON instead of a summary.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct GraphArgs {
    /// Output file; `-` writes to stdout.
    #[arg(long, value_name = "PATH", default_value = "tdag.d2")]
    pub out: PathBuf,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
