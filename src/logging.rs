// src/logging.rs

//! Tracing subscriber for the `tdag` binary.
//!
//! The filter is chosen as follows:
//! - `--log-level` sets one global level and ignores the environment;
//! - otherwise `TDAG_LOG` is read as an `EnvFilter` directive list, so
//!   `TDAG_LOG=warn,tdag::node=debug` shows only test output in detail;
//! - otherwise everything at `info` and above.
//!
//! Output goes to stderr; stdout is reserved for the run summary, the JSON
//! report and `graph --out -`.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::cli::LogLevel;

/// Environment variable holding filter directives when no `--log-level` is
/// given.
pub const LOG_ENV: &str = "TDAG_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = build_filter(cli_level, env.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;

    Ok(())
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Unparseable directives in `env` are dropped rather than rejected.
fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    match cli_level {
        Some(level) => EnvFilter::builder()
            .with_default_directive(LevelFilter::from(level).into())
            .parse_lossy(""),
        None => EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .parse_lossy(env.unwrap_or("")),
    }
}
