// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{
    ConfigFile, ID_SEPARATOR, RawConfigFile, Scenario, node_id, resolve_after,
};
use crate::errors::{Result, TdagError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.scenarios))
    }
}

/// Structural checks. Cycles are caught later, when the DAG is built.
pub fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_scenarios(cfg)?;
    validate_names(cfg)?;
    validate_dependencies(cfg)?;
    Ok(())
}

fn ensure_has_scenarios(cfg: &RawConfigFile) -> Result<()> {
    if cfg.scenarios.is_empty() {
        return Err(TdagError::ConfigError(
            "config must contain at least one scenario".to_string(),
        ));
    }
    Ok(())
}

fn check_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(TdagError::ConfigError(format!("{kind} name must not be empty")));
    }
    if name.contains(ID_SEPARATOR) {
        return Err(TdagError::ConfigError(format!(
            "{kind} name '{name}' must not contain '{ID_SEPARATOR}'"
        )));
    }
    Ok(())
}

fn validate_names(cfg: &RawConfigFile) -> Result<()> {
    let mut scenarios = HashSet::new();
    for scenario in &cfg.scenarios {
        check_name("scenario", &scenario.name)?;
        if !scenarios.insert(scenario.name.as_str()) {
            return Err(TdagError::ConfigError(format!(
                "duplicate scenario '{}'",
                scenario.name
            )));
        }

        let mut tests = HashSet::new();
        for test in &scenario.tests {
            check_name("test", &test.name)?;
            if !tests.insert(test.name.as_str()) {
                return Err(TdagError::ConfigError(format!(
                    "duplicate test '{}' in scenario '{}'",
                    test.name, scenario.name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dependencies(cfg: &RawConfigFile) -> Result<()> {
    let known: HashSet<String> = cfg
        .scenarios
        .iter()
        .flat_map(|s| s.tests.iter().map(move |t| node_id(&s.name, &t.name)))
        .collect();

    for scenario in &cfg.scenarios {
        for test in &scenario.tests {
            let id = node_id(&scenario.name, &test.name);
            for dep in &test.after {
                check_dependency(scenario, &id, dep, &known)?;
            }
        }
    }
    Ok(())
}

fn check_dependency(
    scenario: &Scenario,
    id: &str,
    dep: &str,
    known: &HashSet<String>,
) -> Result<()> {
    let resolved = resolve_after(scenario, dep);
    if !known.contains(&resolved) {
        return Err(TdagError::ConfigError(format!(
            "test '{id}' has unknown dependency '{dep}' in `after`"
        )));
    }
    if resolved == id {
        return Err(TdagError::ConfigError(format!(
            "test '{id}' cannot depend on itself in `after`"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::TestSpec;

    fn test(name: &str, after: &[&str]) -> TestSpec {
        TestSpec {
            name: name.into(),
            command: format!("echo {name}"),
            after: after.iter().map(|s| s.to_string()).collect(),
            env: Default::default(),
        }
    }

    fn raw(scenarios: Vec<(&str, Vec<TestSpec>)>) -> RawConfigFile {
        RawConfigFile {
            scenarios: scenarios
                .into_iter()
                .map(|(name, tests)| Scenario { name: name.into(), tests })
                .collect(),
        }
    }

    fn config_error(raw: RawConfigFile) -> String {
        match ConfigFile::try_from(raw) {
            Err(TdagError::ConfigError(msg)) => msg,
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn empty_config_is_rejected() {
        assert!(config_error(raw(vec![])).contains("at least one scenario"));
    }

    #[test]
    fn local_and_qualified_dependencies_resolve() {
        let cfg = ConfigFile::try_from(raw(vec![
            ("reg", vec![test("register", &[]), test("confirm", &["register"])]),
            ("session", vec![test("login", &["reg.confirm"])]),
        ]))
        .unwrap();

        let resolved: Vec<_> = cfg.tests().map(|t| (t.id, t.after)).collect();
        assert_eq!(
            resolved,
            vec![
                ("reg.register".to_string(), vec![]),
                ("reg.confirm".to_string(), vec!["reg.register".to_string()]),
                ("session.login".to_string(), vec!["reg.confirm".to_string()]),
            ]
        );
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let msg = config_error(raw(vec![("s", vec![test("a", &["nope"])])]));
        assert!(msg.contains("unknown dependency"));
        assert!(msg.contains("nope"));
    }

    #[test]
    fn self_dependency_is_rejected() {
        let msg = config_error(raw(vec![("s", vec![test("a", &["a"])])]));
        assert!(msg.contains("cannot depend on itself"));
        let msg = config_error(raw(vec![("s", vec![test("a", &["s.a"])])]));
        assert!(msg.contains("cannot depend on itself"));
    }

    #[test]
    fn duplicates_and_bad_names_are_rejected() {
        assert!(config_error(raw(vec![("s", vec![]), ("s", vec![])])).contains("duplicate scenario"));
        assert!(
            config_error(raw(vec![("s", vec![test("a", &[]), test("a", &[])])]))
                .contains("duplicate test")
        );
        assert!(config_error(raw(vec![("a.b", vec![])])).contains("must not contain"));
        assert!(config_error(raw(vec![("s", vec![test(" ", &[])])])).contains("must not be empty"));
    }
}
