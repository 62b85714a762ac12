// src/config/model.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Separator between scenario and test name in a node id.
pub const ID_SEPARATOR: char = '.';

/// Top-level configuration as read from disk (YAML, JSON or TOML).
///
/// ```yaml
/// scenarios:
///   - name: registration
///     tests:
///       - name: register
///         command: ./scripts/register.sh
///       - name: confirm
///         command: ./scripts/confirm.sh
///         after: [register]
///   - name: session
///     tests:
///       - name: login
///         command: ./scripts/login.sh
///         after: [registration.confirm]
///         env:
///           BASE_URL: http://localhost:8080
/// ```
///
/// This is the unvalidated form; use `ConfigFile::try_from` (or
/// [`load_and_validate`](crate::config::load_and_validate)) to get a
/// [`ConfigFile`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

/// A named group of tests. Test names are local to their scenario.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub tests: Vec<TestSpec>,
}

/// One test: a shell command plus the tests it must run after.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TestSpec {
    pub name: String,
    pub command: String,

    /// Tests that must complete before this one starts.
    ///
    /// A bare name refers to a test in the same scenario; anything else must
    /// be a full `scenario.test` id.
    #[serde(default)]
    pub after: Vec<String>,

    /// Extra environment variables for the command.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>`, so holders can rely on
/// unique names and resolvable `after` references.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    scenarios: Vec<Scenario>,
}

/// A test with its node id and fully resolved dependency ids.
#[derive(Debug, Clone)]
pub struct ResolvedTest<'a> {
    pub id: String,
    pub spec: &'a TestSpec,
    pub after: Vec<String>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(scenarios: Vec<Scenario>) -> Self {
        Self { scenarios }
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Every test in declaration order, with ids and resolved dependencies.
    pub fn tests(&self) -> impl Iterator<Item = ResolvedTest<'_>> {
        self.scenarios.iter().flat_map(|scenario| {
            scenario.tests.iter().map(move |spec| ResolvedTest {
                id: node_id(&scenario.name, &spec.name),
                spec,
                after: spec
                    .after
                    .iter()
                    .map(|dep| resolve_after(scenario, dep))
                    .collect(),
            })
        })
    }
}

/// `scenario.test`.
pub fn node_id(scenario: &str, test: &str) -> String {
    format!("{scenario}{ID_SEPARATOR}{test}")
}

/// Resolve an `after` entry relative to `scenario`.
pub(crate) fn resolve_after(scenario: &Scenario, dep: &str) -> String {
    if scenario.tests.iter().any(|t| t.name == dep) {
        node_id(&scenario.name, dep)
    } else {
        dep.to_string()
    }
}
