// src/exec/command.rs

//! Node callbacks that run a test's shell command.

use std::collections::BTreeMap;
use std::process::{Command, Output, Stdio};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::config::ResolvedTest;
use crate::context::TestContext;
use crate::store::Store;

/// Environment variable holding the id of the node being run.
pub const NODE_ENV: &str = "TDAG_NODE";

/// Store key under which a command node publishes its trimmed stdout.
pub fn stdout_key(id: &str) -> String {
    format!("{id}.stdout")
}

/// Environment variable through which a dependency's stdout is handed to
/// its dependents, e.g. `registration.confirm` -> `TDAG_OUTPUT_REGISTRATION_CONFIRM`.
pub fn output_env_var(id: &str) -> String {
    let sanitized: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("TDAG_OUTPUT_{sanitized}")
}

/// Everything a command node needs, detached from the config borrow.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub id: String,
    pub command: String,
    pub env: BTreeMap<String, String>,
    /// Ids whose published stdout is exported to this command.
    pub after: Vec<String>,
}

impl From<&ResolvedTest<'_>> for CommandSpec {
    fn from(test: &ResolvedTest<'_>) -> Self {
        Self {
            id: test.id.clone(),
            command: test.spec.command.clone(),
            env: test.spec.env.clone(),
            after: test.after.clone(),
        }
    }
}

/// Build a node callback that runs `spec.command`.
///
/// The command fails the node when it exits non-zero or cannot be spawned.
pub fn command_node<C: 'static>(
    spec: CommandSpec,
) -> impl Fn(&TestContext<C>) -> Result<()> + Send + Sync + 'static {
    move |ctx| run_command(&spec, ctx.store())
}

/// Run one command synchronously on the calling thread.
pub fn run_command(spec: &CommandSpec, store: &Store) -> Result<()> {
    info!(node = %spec.id, cmd = %spec.command, "starting test command");

    let mut cmd = shell(&spec.command);
    cmd.envs(&spec.env)
        .env(NODE_ENV, &spec.id)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    for dep in &spec.after {
        if let Ok(out) = store.get::<String>(&stdout_key(dep)) {
            cmd.env(output_env_var(dep), out);
        }
    }

    let output = cmd
        .output()
        .with_context(|| format!("spawning process for test '{}'", spec.id))?;

    publish(spec, store, &output);

    let code = output.status.code().unwrap_or(-1);
    info!(
        node = %spec.id,
        exit_code = code,
        success = output.status.success(),
        "test command exited"
    );

    if !output.status.success() {
        bail!("command `{}` exited with code {code}", spec.command);
    }
    Ok(())
}

/// Build a shell command appropriate for the platform.
fn shell(command: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    }
}

fn publish(spec: &CommandSpec, store: &Store, output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        debug!(node = %spec.id, "stdout: {}", line);
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        debug!(node = %spec.id, "stderr: {}", line);
    }
    store.set(stdout_key(&spec.id), stdout.trim().to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_names_are_sanitized() {
        assert_eq!(output_env_var("registration.confirm"), "TDAG_OUTPUT_REGISTRATION_CONFIRM");
        assert_eq!(output_env_var("a-b.c1"), "TDAG_OUTPUT_A_B_C1");
    }

    #[cfg(unix)]
    #[test]
    fn stdout_is_published_and_exit_code_checked() {
        let store = Store::new();
        let ok = CommandSpec {
            id: "s.ok".into(),
            command: "echo \"  hello from $TDAG_NODE  \"".into(),
            env: BTreeMap::new(),
            after: vec![],
        };
        run_command(&ok, &store).unwrap();
        assert_eq!(store.get::<String>("s.ok.stdout").unwrap(), "hello from s.ok");

        let bad = CommandSpec {
            id: "s.bad".into(),
            command: "echo partial; exit 3".into(),
            env: BTreeMap::new(),
            after: vec![],
        };
        let err = run_command(&bad, &store).unwrap_err();
        assert!(err.to_string().contains("exited with code 3"));
        assert_eq!(store.get::<String>("s.bad.stdout").unwrap(), "partial");
    }

    #[cfg(unix)]
    #[test]
    fn upstream_output_and_env_reach_the_command() {
        let store = Store::new();
        store.set(stdout_key("s.token"), String::from("abc123"));

        let spec = CommandSpec {
            id: "s.use".into(),
            command: "echo \"$TDAG_OUTPUT_S_TOKEN:$GREETING\"".into(),
            env: BTreeMap::from([("GREETING".to_string(), "hi".to_string())]),
            after: vec!["s.token".into(), "s.absent".into()],
        };
        run_command(&spec, &store).unwrap();
        assert_eq!(store.get::<String>("s.use.stdout").unwrap(), "abc123:hi");
    }
}
