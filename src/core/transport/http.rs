//! HTTP transport implementation.
//!
//! REST endpoints for tool discovery and execution:
//!
//! - `GET  /mcp/v1/tools` - every registered tool definition
//! - `POST /mcp/v1/tools/{name}:execute` - run one tool with `{arguments}`
//!
//! Tool errors map to status codes: not found is 404, invalid arguments is
//! 400 and any execution failure is 500, each with a `{detail}` body.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use super::{TransportError, TransportResult, config::HttpConfig};
use crate::core::McpServer;
use crate::domains::tools::{JsonObject, ToolDefinition, ToolError};

/// Suffix of the execution path segment.
const EXECUTE_SUFFIX: &str = ":execute";

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// Body of an execution request.
#[derive(Debug, Default, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub arguments: JsonObject,
}

/// Body of a successful execution.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub result: String,
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// A failed request, rendered as `{detail}` with the matching status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }

    /// Translate a tool error raised while running `tool`.
    fn from_tool(tool: &str, err: ToolError) -> Self {
        match err {
            ToolError::NotFound(_) => Self::not_found(format!("Tool '{}' not found.", tool)),
            ToolError::InvalidArguments(msg) => Self {
                status: StatusCode::BAD_REQUEST,
                detail: format!("Invalid arguments for tool '{}': {}", tool, msg),
            },
            ToolError::ExecutionFailed(msg) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: format!("An error occurred while executing the tool: {}", msg),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { detail: self.detail })).into_response()
    }
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        self.config.address()
    }

    /// Run the HTTP transport until Ctrl-C or SIGTERM.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();
        let app = router(server, &self.config);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!("Ready - listening on {} (CORS {})", addr, cors_status);
        info!("  → Tools:   GET  /mcp/v1/tools");
        info!("  → Execute: POST /mcp/v1/tools/{{name}}:execute");
        info!("  → Health:  GET  /health");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(TransportError::Serve)?;

        info!("HTTP transport stopped");
        Ok(())
    }
}

/// Build the application router.
pub fn router(server: McpServer, config: &HttpConfig) -> Router {
    let app = Router::new()
        .route("/mcp/v1/tools", get(list_tools))
        .route("/mcp/v1/tools/{call}", post(execute_tool))
        .route("/health", get(health_check))
        .route("/", get(root_handler))
        .with_state(server)
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app.layer(cors)
    } else {
        app
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Root handler - provides API info.
async fn root_handler(State(server): State<McpServer>) -> impl IntoResponse {
    Json(json!({
        "name": server.name(),
        "version": server.version(),
        "transport": "HTTP",
        "endpoints": {
            "tools": "GET /mcp/v1/tools",
            "execute": "POST /mcp/v1/tools/{name}:execute",
            "health": "GET /health"
        }
    }))
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// List every registered tool.
#[instrument(skip_all)]
async fn list_tools(State(server): State<McpServer>) -> Json<Vec<ToolDefinition>> {
    let tools = server.list_tools();
    info!("Listing {} tools", tools.len());
    Json(tools)
}

/// Execute one tool. The path segment must be `<name>:execute`.
#[instrument(skip_all, fields(call = %call))]
async fn execute_tool(
    State(server): State<McpServer>,
    Path(call): Path<String>,
    body: Option<Json<ExecuteRequest>>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let Some(name) = call.strip_suffix(EXECUTE_SUFFIX) else {
        return Err(ApiError::not_found(format!("Unknown endpoint '{}'.", call)));
    };

    let arguments = body.map(|Json(req)| req.arguments).unwrap_or_default();

    server
        .execute(name, arguments)
        .await
        .map(|result| Json(ExecuteResponse { result }))
        .map_err(|e| ApiError::from_tool(name, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::domains::tools::definitions::TimeModule;
    use crate::domains::tools::{ModuleExports, ModuleLoader, Tool, ToolContext, ToolDescriptor, ToolModule};
    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct EchoParams {
        text: String,
    }

    #[derive(Deserialize)]
    struct NoParams {}

    fn echo_tool() -> Tool {
        let descriptor = ToolDescriptor::builder("echo", "Echo the input")
            .required_param("text", "string", "Text to echo")
            .build();
        Tool::sync(descriptor, |p: EchoParams| Ok(p.text))
    }

    fn failing_tool() -> Tool {
        let descriptor = ToolDescriptor::builder("fail", "Always fails").build();
        Tool::asynchronous(descriptor, |_: NoParams| async {
            Err(ToolError::execution_failed("upstream unavailable"))
        })
    }

    fn app(tools: Vec<Tool>) -> Router {
        let mut context = ToolContext::new();
        for tool in tools {
            context.registry_mut().register(tool, "test");
        }
        let server = McpServer::from_context(Config::default(), context);
        router(server, &HttpConfig::default())
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_list_tools_shape() {
        let (status, body) = send(app(vec![echo_tool()]), "GET", "/mcp/v1/tools", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{
                "function": {
                    "name": "echo",
                    "description": "Echo the input",
                    "parameters": {
                        "properties": { "text": { "type": "string", "description": "Text to echo" } },
                        "required": ["text"]
                    }
                }
            }])
        );
    }

    #[tokio::test]
    async fn test_list_tools_empty_registry() {
        let (status, body) = send(app(vec![]), "GET", "/mcp/v1/tools", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_execute_echo() {
        let (status, body) = send(
            app(vec![echo_tool()]),
            "POST",
            "/mcp/v1/tools/echo:execute",
            Some(json!({ "arguments": { "text": "hi" } })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "result": "hi" }));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_404() {
        let (status, body) = send(
            app(vec![echo_tool()]),
            "POST",
            "/mcp/v1/tools/missing_tool:execute",
            Some(json!({ "arguments": {} })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "detail": "Tool 'missing_tool' not found." }));
    }

    #[tokio::test]
    async fn test_missing_argument_is_400() {
        let (status, body) = send(
            app(vec![echo_tool()]),
            "POST",
            "/mcp/v1/tools/echo:execute",
            Some(json!({ "arguments": {} })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.starts_with("Invalid arguments for tool 'echo': "), "{detail}");
    }

    #[tokio::test]
    async fn test_execution_failure_is_500() {
        let (status, body) = send(
            app(vec![failing_tool()]),
            "POST",
            "/mcp/v1/tools/fail:execute",
            Some(json!({})),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "detail": "An error occurred while executing the tool: upstream unavailable" })
        );
    }

    #[tokio::test]
    async fn test_missing_body_defaults_to_empty_arguments() {
        let (status, body) =
            send(app(vec![failing_tool()]), "POST", "/mcp/v1/tools/fail:execute", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_path_without_execute_suffix_is_404() {
        let (status, body) =
            send(app(vec![echo_tool()]), "POST", "/mcp/v1/tools/echo", Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app(vec![]), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_invalid_timezone_is_200_with_in_band_error() {
        let modules: Vec<Arc<dyn ToolModule>> = vec![Arc::new(TimeModule)];
        let mut context = ToolContext::new();
        ModuleLoader::new(modules).discover(&Config::default(), &mut context);
        let router = router(McpServer::from_context(Config::default(), context), &HttpConfig::default());

        let (status, body) = send(
            router,
            "POST",
            "/mcp/v1/tools/get_current_time:execute",
            Some(json!({ "arguments": { "timezone": "Invalid/Zone" } })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["result"].as_str().unwrap().contains("Error: Invalid timezone"));
    }

    struct Broken;

    impl ToolModule for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn load(&self, _config: &Config) -> anyhow::Result<ModuleExports> {
            anyhow::bail!("missing dependency")
        }
    }

    struct Echo;

    impl ToolModule for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn load(&self, _config: &Config) -> anyhow::Result<ModuleExports> {
            Ok(ModuleExports::new().with_tool(echo_tool()))
        }
    }

    #[tokio::test]
    async fn test_broken_module_does_not_hide_others() {
        let modules: Vec<Arc<dyn ToolModule>> = vec![Arc::new(Broken), Arc::new(Echo)];
        let loader = ModuleLoader::new(modules);
        let mut context = ToolContext::new();
        let report = loader.discover(&Config::default(), &mut context);
        assert_eq!(report.failed.len(), 1);

        let router = router(McpServer::from_context(Config::default(), context), &HttpConfig::default());
        let (status, body) = send(router, "GET", "/mcp/v1/tools", None).await;

        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["function"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["echo"]);
    }

    #[tokio::test]
    async fn test_occupied_port_is_bind_error() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let config = HttpConfig {
            port,
            ..HttpConfig::default()
        };
        let server = McpServer::from_context(Config::default(), ToolContext::new());

        let err = HttpTransport::new(config).run(server).await.unwrap_err();
        let TransportError::Bind { address, .. } = &err else {
            panic!("expected a bind error, got {err}");
        };
        assert_eq!(*address, format!("127.0.0.1:{port}"));
        assert!(err.to_string().starts_with("Failed to bind HTTP listener to"));
    }
}
