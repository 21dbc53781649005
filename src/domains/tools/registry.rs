//! Tool Registry - name to tool mapping built by one discovery pass.
//!
//! This module provides:
//! - The insertion-ordered [`ToolRegistry`]
//! - [`ToolContext`], which pairs the registry with the lifecycle hook lists
//!   so a rebuild clears both together

use std::collections::HashMap;
use tracing::{debug, warn};

use super::descriptor::ToolDescriptor;
use super::error::ToolError;
use super::handler::Tool;
use super::lifecycle::LifecycleHooks;

// ============================================================================
// Tool Registry
// ============================================================================

/// A tool owned by the registry, tagged with the module that provided it.
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    pub tool: Tool,
    pub module: String,
}

impl RegisteredTool {
    pub fn descriptor(&self) -> &ToolDescriptor {
        self.tool.descriptor()
    }
}

/// Tool registry - maps tool names to registered tools.
///
/// Listing order is registration order. Registering a name that is already
/// present replaces the entry in place (last write wins).
#[derive(Debug, Default)]
pub struct ToolRegistry {
    entries: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tool, returning the entry it displaced if the name was taken.
    pub fn register(&mut self, tool: Tool, module: impl Into<String>) -> Option<RegisteredTool> {
        let entry = RegisteredTool {
            tool,
            module: module.into(),
        };
        let name = entry.tool.name().to_string();

        match self.index.get(&name) {
            Some(&slot) => {
                let previous = std::mem::replace(&mut self.entries[slot], entry);
                warn!(
                    "Tool '{}' from module '{}' replaces the one registered by '{}'",
                    name, self.entries[slot].module, previous.module
                );
                Some(previous)
            }
            None => {
                debug!("Registered tool '{}' from '{}'", name, entry.module);
                self.index.insert(name, self.entries.len());
                self.entries.push(entry);
                None
            }
        }
    }

    /// Find a tool by name.
    pub fn lookup(&self, name: &str) -> Result<&RegisteredTool, ToolError> {
        self.get(name).ok_or_else(|| ToolError::not_found(name))
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&slot| &self.entries[slot])
    }

    /// Descriptors of every registered tool, in registration order.
    pub fn list(&self) -> Vec<&ToolDescriptor> {
        self.entries.iter().map(RegisteredTool::descriptor).collect()
    }

    /// Get all tool names.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.tool.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

// ============================================================================
// Tool Context
// ============================================================================

/// Everything one discovery pass produces: the registry and the hook lists.
///
/// Built mutably by the loader, then frozen behind an `Arc` for serving.
#[derive(Debug, Default)]
pub struct ToolContext {
    registry: ToolRegistry,
    hooks: LifecycleHooks,
}

impl ToolContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ToolRegistry {
        &mut self.registry
    }

    pub fn hooks(&self) -> &LifecycleHooks {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut LifecycleHooks {
        &mut self.hooks
    }

    /// Empty the registry and both hook lists.
    pub fn clear(&mut self) {
        self.registry.clear();
        self.hooks.clear();
    }
}
