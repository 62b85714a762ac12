// src/errors.rs

//! Crate-wide error type and result alias.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Lifecycle phase a hook belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPhase {
    Setup,
    BeforeEach,
    AfterEach,
    Teardown,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HookPhase::Setup => "setup",
            HookPhase::BeforeEach => "before-each",
            HookPhase::AfterEach => "after-each",
            HookPhase::Teardown => "teardown",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum TdagError {
    #[error("node {0} does not exist")]
    UnknownNode(String),

    #[error("node {0} is already registered")]
    DuplicateNode(String),

    #[error("adding edge from {from} to {to} would create a cycle ({path})")]
    CycleRejected {
        from: String,
        to: String,
        /// Existing route from `to` back to `from`, rendered `a -> b -> c`.
        path: String,
    },

    #[error("key {0} not found")]
    KeyNotFound(String),

    #[error("key {key} holds a value that is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("dependency cycle detected; remaining nodes: {remaining:?}")]
    DependencyDeadlock { remaining: Vec<String> },

    #[error("{phase} hook failed: {message}")]
    HookFailed { phase: HookPhase, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("unsupported config format for {0:?} (expected .yaml, .yml, .json or .toml)")]
    UnsupportedConfigFormat(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TdagError>;
