//! MCP Server implementation and lifecycle management.
//!
//! [`McpServer`] owns the frozen tool context built at startup and hands
//! every call to the [`Dispatcher`]. Transports only translate between their
//! wire format and [`McpServer::execute`].
//!
//! ## Lifecycle
//!
//! 1. [`McpServer::bootstrap`] discovers every module of the manifest
//! 2. Startup hooks run in order; the first failure aborts startup
//! 3. The transport serves requests against the frozen registry
//! 4. [`McpServer::shutdown`] runs every shutdown hook, best-effort
//!
//! **Adding a new tool does NOT require modifying this file!**

use std::sync::Arc;
use tracing::{info, warn};

use super::config::Config;
use super::error::Result;
use crate::domains::tools::{
    Dispatcher, JsonObject, ModuleLoader, ShutdownReport, ToolContext, ToolDefinition, ToolError,
    ToolModule,
};

/// The main MCP server handler.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Dispatcher over the frozen tool context.
    dispatcher: Dispatcher,
}

impl McpServer {
    /// Discover `modules`, run their startup hooks and return a ready server.
    ///
    /// Modules that fail to load are skipped. A failing startup hook is
    /// fatal: the shutdown hooks that were collected are run to release
    /// whatever the earlier hooks acquired, and the error is returned.
    pub async fn bootstrap(config: Config, modules: Vec<Arc<dyn ToolModule>>) -> Result<Self> {
        let loader = ModuleLoader::new(modules);
        let mut context = ToolContext::new();
        let report = loader.discover(&config, &mut context);

        for (module, reason) in &report.failed {
            warn!("Module '{}' is unavailable: {}", module, reason);
        }

        if let Err(e) = context.hooks().run_startup().await {
            context.hooks().run_shutdown().await;
            return Err(e.into());
        }

        info!(
            "Server initialized with {} tools: {}",
            context.registry().len(),
            context.registry().names().join(", ")
        );

        Ok(Self::from_context(config, context))
    }

    /// Wrap an already populated context without running any hooks.
    pub fn from_context(config: Config, context: ToolContext) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: Dispatcher::new(Arc::new(context)),
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Definitions of every registered tool, in registration order.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.dispatcher
            .list()
            .into_iter()
            .map(|descriptor| descriptor.to_definition())
            .collect()
    }

    /// Execute a tool by name.
    pub async fn execute(&self, name: &str, arguments: JsonObject) -> std::result::Result<String, ToolError> {
        self.dispatcher.execute(name, arguments).await
    }

    /// Run every shutdown hook.
    pub async fn shutdown(&self) -> ShutdownReport {
        let report = self.dispatcher.context().hooks().run_shutdown().await;
        if report.is_clean() {
            info!("Shutdown complete ({} hooks)", report.ran);
        } else {
            warn!(
                "Shutdown finished with {} failed hooks out of {}",
                report.failures.len(),
                report.ran
            );
        }
        report
    }
}

// ============================================================================
// STDIO Transport Support (rmcp)
// ============================================================================

#[cfg(feature = "stdio")]
mod mcp {
    use rmcp::{
        ErrorData as McpError, RoleServer, ServerHandler, model::*, service::RequestContext,
    };
    use std::sync::Arc;
    use tracing::{info, instrument};

    use super::McpServer;
    use crate::domains::tools::{ToolDescriptor, ToolError};

    fn to_mcp_tool(descriptor: &ToolDescriptor) -> Tool {
        Tool::new(
            descriptor.name().to_string(),
            descriptor.description().to_string(),
            Arc::new(descriptor.schema().to_json_schema()),
        )
    }

    impl ServerHandler for McpServer {
        fn get_info(&self) -> ServerInfo {
            ServerInfo {
                instructions: Some(
                    "Tool gateway. Call tools/list to discover the available tools.".to_string(),
                ),
                capabilities: ServerCapabilities::builder().enable_tools().build(),
                ..Default::default()
            }
        }

        #[instrument(skip(self, _request, _context))]
        async fn list_tools(
            &self,
            _request: Option<PaginatedRequestParam>,
            _context: RequestContext<RoleServer>,
        ) -> Result<ListToolsResult, McpError> {
            info!("Listing tools");
            let tools = self.dispatcher.list().into_iter().map(to_mcp_tool).collect();
            Ok(ListToolsResult {
                tools,
                next_cursor: None,
                meta: None,
            })
        }

        #[instrument(skip(self, _context), fields(tool = %request.name))]
        async fn call_tool(
            &self,
            request: CallToolRequestParam,
            _context: RequestContext<RoleServer>,
        ) -> Result<CallToolResult, McpError> {
            let arguments = request.arguments.unwrap_or_default();
            call_result(self.execute(&request.name, arguments).await)
        }
    }

    /// Map a dispatch outcome onto the MCP reply.
    ///
    /// Unknown tools and bad arguments are protocol errors; a failed
    /// execution is a tool result flagged `isError`.
    fn call_result(result: Result<String, ToolError>) -> Result<CallToolResult, McpError> {
        match result {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e @ (ToolError::NotFound(_) | ToolError::InvalidArguments(_))) => {
                Err(McpError::invalid_params(e.to_string(), None))
            }
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_to_mcp_tool_carries_schema() {
            let descriptor = ToolDescriptor::builder("echo", "Echo the input")
                .required_param("text", "string", "Text to echo")
                .build();
            let tool = to_mcp_tool(&descriptor);

            assert_eq!(tool.name, "echo");
            assert_eq!(tool.description.as_deref(), Some("Echo the input"));
            assert_eq!(tool.input_schema["type"], "object");
            assert_eq!(tool.input_schema["properties"]["text"]["type"], "string");
            assert_eq!(tool.input_schema["required"], serde_json::json!(["text"]));
        }

        #[test]
        fn test_success_is_text_content() {
            let result = call_result(Ok("12:00".to_string())).unwrap();
            assert!(!result.is_error.unwrap_or(false));
            assert_eq!(result.content.len(), 1);
        }

        #[test]
        fn test_unknown_tool_is_invalid_params() {
            let err = call_result(Err(ToolError::not_found("ghost"))).unwrap_err();
            assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
            assert!(err.message.contains("ghost"));
        }

        #[test]
        fn test_bad_arguments_are_invalid_params() {
            let err = call_result(Err(ToolError::invalid_arguments("missing 'text'"))).unwrap_err();
            assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
            assert!(err.message.contains("missing 'text'"));
        }

        #[test]
        fn test_execution_failure_is_flagged_result() {
            let result = call_result(Err(ToolError::execution_failed("backend down"))).unwrap();
            assert!(result.is_error.unwrap_or(false));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
