// src/dag/hooks.rs

//! Lifecycle hooks attached to a [`Dag`](crate::dag::Dag).
//!
//! - setup hooks run once, in registration order, before the first wave;
//! - before-each / after-each hooks wrap every node on that node's thread;
//! - teardown hooks run once, in registration order, after the last wave.
//!
//! Hooks are not part of the dependency graph.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::TestContext;
use crate::errors::HookPhase;
use crate::report::HookFailure;

type HookFn<C> = dyn Fn(&TestContext<C>) -> anyhow::Result<()> + Send + Sync;

pub(crate) struct Hook<C>(Arc<HookFn<C>>);

impl<C> Hook<C> {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: Fn(&TestContext<C>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl<C> Clone for Hook<C> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

pub(crate) struct Hooks<C> {
    pub(crate) setup: Vec<Hook<C>>,
    pub(crate) teardown: Vec<Hook<C>>,
    pub(crate) before_each: Vec<Hook<C>>,
    pub(crate) after_each: Vec<Hook<C>>,
}

impl<C> Default for Hooks<C> {
    fn default() -> Self {
        Self {
            setup: Vec::new(),
            teardown: Vec::new(),
            before_each: Vec::new(),
            after_each: Vec::new(),
        }
    }
}

impl<C> fmt::Debug for Hooks<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("setup", &self.setup.len())
            .field("teardown", &self.teardown.len())
            .field("before_each", &self.before_each.len())
            .field("after_each", &self.after_each.len())
            .finish()
    }
}

/// How a guarded call went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CallFailure {
    Error(String),
    Panic(String),
}

impl CallFailure {
    pub(crate) fn message(&self) -> &str {
        match self {
            CallFailure::Error(m) | CallFailure::Panic(m) => m,
        }
    }
}

/// Invoke `f`, turning both `Err` and a panic into a [`CallFailure`].
pub(crate) fn guarded<F>(f: F) -> Result<(), CallFailure>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(CallFailure::Error(format!("{err:#}"))),
        Err(payload) => Err(CallFailure::Panic(panic_message(payload.as_ref()))),
    }
}

/// Invoke `f`, handing back the panic message if it unwinds.
pub(crate) fn catch_panic<F: FnOnce()>(f: F) -> Result<(), String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run every hook in `hooks` in order, stopping at the first failure.
pub(crate) fn run_until_failure<C>(
    phase: HookPhase,
    hooks: &[Hook<C>],
    ctx: &TestContext<C>,
) -> Result<(), CallFailure> {
    for (i, hook) in hooks.iter().enumerate() {
        debug!(%phase, hook = i, "running hook");
        guarded(|| (hook.0)(ctx)).inspect_err(|failure| {
            warn!(%phase, hook = i, error = %failure.message(), "hook failed");
        })?;
    }
    Ok(())
}

/// Run every hook in `hooks` in order, collecting failures instead of
/// stopping. Used for teardown.
pub(crate) fn run_all_collecting<C>(
    phase: HookPhase,
    hooks: &[Hook<C>],
    ctx: &TestContext<C>,
) -> Vec<HookFailure> {
    hooks
        .iter()
        .enumerate()
        .filter_map(|(i, hook)| {
            debug!(%phase, hook = i, "running hook");
            guarded(|| (hook.0)(ctx)).err().map(|failure| {
                warn!(%phase, hook = i, error = %failure.message(), "hook failed");
                HookFailure {
                    phase,
                    message: failure.message().to_string(),
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guarded_maps_errors_and_panics() {
        assert_eq!(guarded(|| Ok(())), Ok(()));
        assert_eq!(
            guarded(|| Err(anyhow::anyhow!("boom"))),
            Err(CallFailure::Error("boom".into()))
        );
        assert_eq!(
            guarded(|| panic!("kaput {}", 1)),
            Err(CallFailure::Panic("kaput 1".into()))
        );
    }

    #[test]
    fn catch_panic_reports_the_payload() {
        assert_eq!(catch_panic(|| {}), Ok(()));
        assert_eq!(
            catch_panic(|| panic!("{} went away", "reporter")),
            Err("reporter went away".to_string())
        );
    }

    #[test]
    fn stops_at_first_failure() {
        let ctx = TestContext::empty();
        let hooks = vec![
            Hook::new(|c: &TestContext| {
                c.store().set("first", true);
                Ok(())
            }),
            Hook::new(|_: &TestContext| anyhow::bail!("second broke")),
            Hook::new(|c: &TestContext| {
                c.store().set("third", true);
                Ok(())
            }),
        ];

        let err = run_until_failure(HookPhase::Setup, &hooks, &ctx).unwrap_err();
        assert_eq!(err.message(), "second broke");
        assert!(ctx.store().contains("first"));
        assert!(!ctx.store().contains("third"));
    }

    #[test]
    fn collecting_runs_everything() {
        let ctx = TestContext::empty();
        let hooks = vec![
            Hook::new(|_: &TestContext| anyhow::bail!("one")),
            Hook::new(|c: &TestContext| {
                c.store().set("ran", true);
                Ok(())
            }),
            Hook::new(|_: &TestContext| panic!("two")),
        ];

        let failures = run_all_collecting(HookPhase::Teardown, &hooks, &ctx);
        assert!(ctx.store().contains("ran"));
        let messages: Vec<_> = failures.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["one", "two"]);
        assert!(failures.iter().all(|f| f.phase == HookPhase::Teardown));
    }
}
