#![allow(dead_code)]

use std::collections::BTreeMap;
use tdag::config::{ConfigFile, RawConfigFile, Scenario, TestSpec};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile { scenarios: Vec::new() },
        }
    }

    /// Append a scenario with the given tests.
    pub fn with_scenario(mut self, name: &str, tests: Vec<TestSpec>) -> Self {
        self.config.scenarios.push(Scenario {
            name: name.to_string(),
            tests,
        });
        self
    }

    /// The unvalidated config, for tests that expect validation to fail.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TestSpec`.
pub struct TestSpecBuilder {
    test: TestSpec,
}

impl TestSpecBuilder {
    pub fn new(name: &str, command: &str) -> Self {
        Self {
            test: TestSpec {
                name: name.to_string(),
                command: command.to_string(),
                after: vec![],
                env: BTreeMap::new(),
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.test.after.push(dep.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.test.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> TestSpec {
        self.test
    }
}
