// src/config/mod.rs

//! Scenario configuration.
//!
//! Responsibilities:
//! - Define the serde data model (`model.rs`).
//! - Load a YAML / JSON / TOML file from disk (`loader.rs`).
//! - Validate names and `after` references (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    ConfigFormat, DEFAULT_CONFIG_PATH, load_and_validate, load_from_path, parse_str,
};
pub use model::{ConfigFile, RawConfigFile, ResolvedTest, Scenario, TestSpec, node_id};
pub use validate::validate_raw_config;
