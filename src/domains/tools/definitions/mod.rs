//! Tool definitions module.
//!
//! This is the module manifest: every tool module served by the server is
//! listed in [`builtin_modules`], in discovery order. This file itself never
//! contributes tools.
//!
//! ## Adding a New Tool Module
//!
//! 1. Create a new file (e.g., `my_module.rs`) with a type implementing
//!    [`ToolModule`]
//! 2. Return its tools and optional lifecycle hooks from `load()`
//! 3. Add it to [`builtin_modules`]
//!
//! **No need to modify the server or the transports!**

pub mod database;
pub mod time;

use std::sync::Arc;

use super::loader::ToolModule;

pub use database::DatabaseModule;
pub use time::TimeModule;

/// All built-in tool modules, in discovery order.
pub fn builtin_modules() -> Vec<Arc<dyn ToolModule>> {
    vec![Arc::new(TimeModule), Arc::new(DatabaseModule)]
}
