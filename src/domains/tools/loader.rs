//! Module loader - turns the module manifest into a populated [`ToolContext`].
//!
//! Each entry of the manifest is a [`ToolModule`]. Loading a module may fail
//! (bad configuration, unavailable dependency); that failure is logged and the
//! remaining modules still load, so one broken module never takes the whole
//! server down.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::handler::Tool;
use super::lifecycle::LifecycleHook;
use super::registry::ToolContext;
use crate::core::config::Config;

/// A unit that can contribute tools and lifecycle hooks.
pub trait ToolModule: Send + Sync {
    /// Name used in logs and in [`DiscoveryReport`].
    fn name(&self) -> &str;

    /// Build this module's exports from the current configuration.
    fn load(&self, config: &Config) -> Result<ModuleExports>;
}

/// What a loaded module hands to the registry.
///
/// A single `tool` takes precedence over the `tools` collection: when both
/// are set only `tool` is registered.
#[derive(Debug, Default)]
pub struct ModuleExports {
    pub tool: Option<Tool>,
    pub tools: Vec<Tool>,
    pub on_startup: Option<LifecycleHook>,
    pub on_shutdown: Option<LifecycleHook>,
}

impl ModuleExports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tool = Some(tool);
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = Tool>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn on_startup(mut self, hook: LifecycleHook) -> Self {
        self.on_startup = Some(hook);
        self
    }

    pub fn on_shutdown(mut self, hook: LifecycleHook) -> Self {
        self.on_shutdown = Some(hook);
        self
    }
}

/// Summary of one discovery pass.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Modules that loaded successfully, in manifest order.
    pub loaded: Vec<String>,

    /// `(module, error)` for every module that failed to load.
    pub failed: Vec<(String, String)>,

    /// Tools registered across all modules (including overwrites).
    pub tools_registered: usize,

    /// Collection entries skipped because they did not satisfy the tool shape.
    pub tools_skipped: usize,
}

/// Loads every module of a manifest into a [`ToolContext`].
pub struct ModuleLoader {
    modules: Vec<Arc<dyn ToolModule>>,
}

impl ModuleLoader {
    pub fn new(modules: Vec<Arc<dyn ToolModule>>) -> Self {
        Self { modules }
    }

    /// Clear `context` and repopulate it from the manifest.
    pub fn discover(&self, config: &Config, context: &mut ToolContext) -> DiscoveryReport {
        context.clear();

        let mut report = DiscoveryReport::default();

        for module in &self.modules {
            let name = module.name().to_string();

            let exports = match module.load(config) {
                Ok(exports) => exports,
                Err(e) => {
                    error!("Error loading tool module '{}': {:#}", name, e);
                    report.failed.push((name, format!("{e:#}")));
                    continue;
                }
            };

            let (registered, skipped) = Self::register_exports(&name, exports, context);
            report.tools_registered += registered;
            report.tools_skipped += skipped;
            report.loaded.push(name);
        }

        info!(
            "Discovery finished: {} tools from {} modules ({} failed)",
            context.registry().len(),
            report.loaded.len(),
            report.failed.len()
        );

        report
    }

    fn register_exports(
        module: &str,
        exports: ModuleExports,
        context: &mut ToolContext,
    ) -> (usize, usize) {
        let ModuleExports {
            tool,
            tools,
            on_startup,
            on_shutdown,
        } = exports;

        let candidates = match tool {
            Some(single) => {
                if !tools.is_empty() {
                    warn!(
                        "Module '{}' exports both a single tool and a collection; ignoring the collection",
                        module
                    );
                }
                vec![single]
            }
            None => tools,
        };

        let mut registered = 0;
        let mut skipped = 0;
        for tool in candidates {
            if let Err(reason) = tool.descriptor().validate() {
                warn!(
                    "Skipping invalid tool '{}' in module '{}': {}",
                    tool.name(),
                    module,
                    reason
                );
                skipped += 1;
                continue;
            }
            info!("Successfully registered tool '{}' from {}", tool.name(), module);
            context.registry_mut().register(tool, module);
            registered += 1;
        }

        let has_hooks = on_startup.is_some() || on_shutdown.is_some();
        if let Some(hook) = on_startup {
            context.hooks_mut().add_startup(module, hook);
        }
        if let Some(hook) = on_shutdown {
            context.hooks_mut().add_shutdown(module, hook);
        }

        if registered == 0 && !has_hooks {
            warn!("No valid tools or lifecycle hooks found in module '{}'", module);
        }

        (registered, skipped)
    }
}
