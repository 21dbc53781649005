//! Dispatcher - runs one tool call against a frozen [`ToolContext`].

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

use super::descriptor::ToolDescriptor;
use super::error::{ToolError, panic_text};
use super::handler::JsonObject;
use super::registry::ToolContext;

/// Looks up tools by name and invokes them.
///
/// Cheap to clone; every clone shares the same context.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    context: Arc<ToolContext>,
}

impl Dispatcher {
    pub fn new(context: Arc<ToolContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<ToolContext> {
        &self.context
    }

    /// Descriptors of every registered tool.
    pub fn list(&self) -> Vec<&ToolDescriptor> {
        self.context.registry().list()
    }

    /// Execute a tool by name.
    ///
    /// The handler is invoked exactly once. Panics inside the handler are
    /// reported as [`ToolError::ExecutionFailed`].
    #[instrument(skip_all, fields(tool = %name))]
    pub async fn execute(&self, name: &str, arguments: JsonObject) -> Result<String, ToolError> {
        let entry = match self.context.registry().lookup(name) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Unknown tool requested: {}", name);
                return Err(e);
            }
        };

        check_required(entry.descriptor(), &arguments)?;

        let started = Instant::now();
        let outcome = AssertUnwindSafe(entry.tool.handler().invoke(arguments))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Err(ToolError::NotFound(msg))) => Err(ToolError::ExecutionFailed(msg)),
            Ok(result) => result,
            Err(panic) => Err(ToolError::execution_failed(format!(
                "tool panicked: {}",
                panic_text(panic.as_ref())
            ))),
        };

        match &result {
            Ok(_) => info!("Tool '{}' completed in {:?}", name, started.elapsed()),
            Err(e) => warn!("Tool '{}' failed after {:?}: {}", name, started.elapsed(), e),
        }

        result
    }
}

/// Every required parameter must be present in the argument object.
fn check_required(descriptor: &ToolDescriptor, arguments: &JsonObject) -> Result<(), ToolError> {
    match descriptor
        .schema()
        .required()
        .iter()
        .find(|name| !arguments.contains_key(name.as_str()))
    {
        Some(missing) => Err(ToolError::invalid_arguments(format!(
            "missing required argument '{}'",
            missing
        ))),
        None => Ok(()),
    }
}
