//! Tools domain module.
//!
//! This module handles all tool-related functionality for the MCP server.
//! Tools are named, schema-described functions that MCP clients can execute
//! with JSON arguments.
//!
//! ## Architecture
//!
//! - `definitions/` - Tool modules and the manifest listing them
//! - `descriptor.rs` - Immutable tool metadata and parameter schema
//! - `handler.rs` - Uniform async invocation for sync and async handlers
//! - `registry.rs` - Name-keyed tool registry and the shared tool context
//! - `lifecycle.rs` - Startup and shutdown hooks
//! - `loader.rs` - Module discovery
//! - `dispatcher.rs` - Validation, invocation and error translation
//! - `error.rs` - Tool-specific error types
//!
//! ## Adding a New Tool
//!
//! 1. Create a module in `definitions/` implementing [`ToolModule`]
//! 2. Return a [`Tool`] (or several) from its `load()`
//! 3. Add it to [`builtin_modules`]
//!
//! **No need to modify `server.rs` or the transports!**

pub mod definitions;
mod descriptor;
mod dispatcher;
mod error;
mod handler;
mod lifecycle;
mod loader;
mod registry;

pub use definitions::builtin_modules;
pub use descriptor::{DescriptorBuilder, ParameterSpec, ToolDefinition, ToolDescriptor, ToolSchema};
pub use dispatcher::Dispatcher;
pub use error::ToolError;
pub use handler::{JsonObject, Tool, ToolFuture, ToolHandler, decode_arguments};
pub use lifecycle::{
    HookFuture, LifecycleHook, LifecycleHooks, RegisteredHook, ShutdownReport, StartupError,
};
pub use loader::{DiscoveryReport, ModuleExports, ModuleLoader, ToolModule};
pub use registry::{RegisteredTool, ToolContext, ToolRegistry};
