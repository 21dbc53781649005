//! Lifecycle hooks contributed by tool modules.
//!
//! Startup hooks run one at a time in registration order before the server
//! accepts traffic; the first failure aborts startup. Shutdown hooks run in
//! the same order when the server stops, and a failure is logged without
//! stopping the remaining hooks.

use anyhow::anyhow;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use super::error::panic_text;

/// Future returned by a hook.
pub type HookFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A zero-argument async callback.
#[derive(Clone)]
pub struct LifecycleHook {
    run: Arc<dyn Fn() -> HookFuture + Send + Sync>,
}

impl LifecycleHook {
    pub fn new<F, Fut>(hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            run: Arc::new(move || hook().boxed()),
        }
    }

    pub fn run(&self) -> HookFuture {
        (self.run)()
    }
}

impl fmt::Debug for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHook").finish_non_exhaustive()
    }
}

/// A hook tagged with the module that contributed it.
#[derive(Debug, Clone)]
pub struct RegisteredHook {
    pub module: String,
    pub hook: LifecycleHook,
}

/// A startup hook failed; the server must not start.
#[derive(Debug, Error)]
#[error("Startup hook of module '{module}' failed: {source:#}")]
pub struct StartupError {
    pub module: String,
    #[source]
    pub source: anyhow::Error,
}

/// Outcome of running the shutdown hooks.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Number of hooks that were run.
    pub ran: usize,

    /// `(module, message)` for every hook that failed.
    pub failures: Vec<(String, String)>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ordered startup and shutdown hook lists.
#[derive(Debug, Default)]
pub struct LifecycleHooks {
    startup: Vec<RegisteredHook>,
    shutdown: Vec<RegisteredHook>,
}

impl LifecycleHooks {
    pub fn add_startup(&mut self, module: impl Into<String>, hook: LifecycleHook) {
        self.startup.push(RegisteredHook {
            module: module.into(),
            hook,
        });
    }

    pub fn add_shutdown(&mut self, module: impl Into<String>, hook: LifecycleHook) {
        self.shutdown.push(RegisteredHook {
            module: module.into(),
            hook,
        });
    }

    pub fn startup(&self) -> &[RegisteredHook] {
        &self.startup
    }

    pub fn shutdown(&self) -> &[RegisteredHook] {
        &self.shutdown
    }

    pub fn clear(&mut self) {
        self.startup.clear();
        self.shutdown.clear();
    }

    /// Run every startup hook in order, stopping at the first failure.
    ///
    /// A panicking hook counts as a failure.
    pub async fn run_startup(&self) -> Result<(), StartupError> {
        for entry in &self.startup {
            info!("Running startup hook for module '{}'", entry.module);

            let outcome = AssertUnwindSafe(entry.hook.run()).catch_unwind().await;
            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(panic) => anyhow!("startup hook panicked: {}", panic_text(panic.as_ref())),
            };

            error!(
                "Startup hook for module '{}' failed: {:#}",
                entry.module, failure
            );
            return Err(StartupError {
                module: entry.module.clone(),
                source: failure,
            });
        }
        Ok(())
    }

    /// Run every shutdown hook in order.
    ///
    /// A failing or panicking hook is logged and recorded; the rest still run.
    pub async fn run_shutdown(&self) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        for entry in &self.shutdown {
            info!("Running shutdown hook for module '{}'", entry.module);
            report.ran += 1;

            let outcome = AssertUnwindSafe(entry.hook.run()).catch_unwind().await;
            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(format!("{e:#}")),
                Err(panic) => Some(format!(
                    "shutdown hook panicked: {}",
                    panic_text(panic.as_ref())
                )),
            };

            if let Some(message) = failure {
                error!(
                    "Shutdown hook for module '{}' failed: {}",
                    entry.module, message
                );
                report.failures.push((entry.module.clone(), message));
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recording_hook(log: &Arc<Mutex<Vec<String>>>, label: &str, fail: bool) -> LifecycleHook {
        let log = log.clone();
        let label = label.to_string();
        LifecycleHook::new(move || {
            let log = log.clone();
            let label = label.clone();
            async move {
                log.lock().push(label.clone());
                if fail {
                    anyhow::bail!("{label} exploded");
                }
                Ok(())
            }
        })
    }

    fn panicking_hook() -> anyhow::Result<()> {
        panic!("hook bug")
    }

    #[tokio::test]
    async fn test_startup_runs_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = LifecycleHooks::default();
        hooks.add_startup("a", recording_hook(&log, "a", false));
        hooks.add_startup("b", recording_hook(&log, "b", false));
        hooks.add_startup("c", recording_hook(&log, "c", false));

        hooks.run_startup().await.unwrap();
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_startup_failure_stops_sequence() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = LifecycleHooks::default();
        hooks.add_startup("a", recording_hook(&log, "a", false));
        hooks.add_startup("b", recording_hook(&log, "b", true));
        hooks.add_startup("c", recording_hook(&log, "c", false));

        let err = hooks.run_startup().await.unwrap_err();
        assert_eq!(err.module, "b");
        assert!(err.to_string().contains("b exploded"));
        assert_eq!(*log.lock(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_panicking_startup_hook_is_a_startup_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = LifecycleHooks::default();
        hooks.add_startup("a", recording_hook(&log, "a", false));
        hooks.add_startup("b", LifecycleHook::new(|| async { panicking_hook() }));
        hooks.add_startup("c", recording_hook(&log, "c", false));

        let err = hooks.run_startup().await.unwrap_err();
        assert_eq!(err.module, "b");
        assert!(err.to_string().contains("startup hook panicked: hook bug"));
        assert_eq!(*log.lock(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_shutdown_continues_after_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = LifecycleHooks::default();
        hooks.add_shutdown("a", recording_hook(&log, "a", true));
        hooks.add_shutdown("b", recording_hook(&log, "b", false));
        hooks.add_shutdown("c", LifecycleHook::new(|| async { panicking_hook() }));
        hooks.add_shutdown("d", recording_hook(&log, "d", false));

        let report = hooks.run_shutdown().await;
        assert_eq!(report.ran, 4);
        assert!(!report.is_clean());
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].0, "a");
        assert_eq!(report.failures[1].0, "c");
        assert_eq!(*log.lock(), vec!["a", "b", "d"]);
    }

    #[tokio::test]
    async fn test_empty_lists_are_noops() {
        let hooks = LifecycleHooks::default();
        hooks.run_startup().await.unwrap();
        let report = hooks.run_shutdown().await;
        assert_eq!(report.ran, 0);
        assert!(report.is_clean());
    }
}
