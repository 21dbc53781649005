//! Tool handlers.
//!
//! Every handler is invoked the same way: it receives the raw JSON argument
//! object and returns a boxed future resolving to the result string.
//! Synchronous handlers are wrapped so their future resolves on first poll,
//! which means callers never need to know which kind they are calling.
//!
//! Handlers declare a typed params struct; the raw arguments are decoded into
//! it before the handler body runs and any decode failure surfaces as
//! [`ToolError::InvalidArguments`].

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::descriptor::ToolDescriptor;
use super::error::ToolError;

/// Raw argument object of a tool call.
pub type JsonObject = Map<String, Value>;

/// Future returned by every handler invocation.
pub type ToolFuture = BoxFuture<'static, Result<String, ToolError>>;

type InvokeFn = dyn Fn(JsonObject) -> ToolFuture + Send + Sync;

/// Decode a raw argument object into a typed params struct.
pub fn decode_arguments<P: DeserializeOwned>(arguments: JsonObject) -> Result<P, ToolError> {
    serde_json::from_value(Value::Object(arguments))
        .map_err(|e| ToolError::invalid_arguments(e.to_string()))
}

/// Executable half of a tool.
#[derive(Clone)]
pub struct ToolHandler {
    invoke: Arc<InvokeFn>,
}

impl ToolHandler {
    /// Wrap an async function taking typed params.
    pub fn from_async<P, F, Fut>(handler: F) -> Self
    where
        P: DeserializeOwned + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        Self {
            invoke: Arc::new(move |arguments: JsonObject| {
                let handler = handler.clone();
                async move {
                    match decode_arguments::<P>(arguments) {
                        Ok(params) => handler(params).await,
                        Err(e) => Err(e),
                    }
                }
                .boxed()
            }),
        }
    }

    /// Wrap a synchronous function taking typed params.
    ///
    /// The function runs inside the returned future, on first poll.
    pub fn from_sync<P, F>(handler: F) -> Self
    where
        P: DeserializeOwned + Send + 'static,
        F: Fn(P) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        Self {
            invoke: Arc::new(move |arguments: JsonObject| {
                let handler = handler.clone();
                async move {
                    decode_arguments::<P>(arguments).and_then(|params| handler(params))
                }
                .boxed()
            }),
        }
    }

    /// Start one invocation.
    pub fn invoke(&self, arguments: JsonObject) -> ToolFuture {
        (self.invoke)(arguments)
    }
}

impl fmt::Debug for ToolHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolHandler").finish_non_exhaustive()
    }
}

/// A descriptor bound to its handler - the unit a module exports.
#[derive(Debug, Clone)]
pub struct Tool {
    descriptor: ToolDescriptor,
    handler: ToolHandler,
}

impl Tool {
    pub fn new(descriptor: ToolDescriptor, handler: ToolHandler) -> Self {
        Self {
            descriptor,
            handler,
        }
    }

    /// Build a tool backed by a synchronous function.
    pub fn sync<P, F>(descriptor: ToolDescriptor, handler: F) -> Self
    where
        P: DeserializeOwned + Send + 'static,
        F: Fn(P) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        Self::new(descriptor, ToolHandler::from_sync(handler))
    }

    /// Build a tool backed by an async function.
    pub fn asynchronous<P, F, Fut>(descriptor: ToolDescriptor, handler: F) -> Self
    where
        P: DeserializeOwned + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        Self::new(descriptor, ToolHandler::from_async(handler))
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    pub fn handler(&self) -> &ToolHandler {
        &self.handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct EchoParams {
        text: String,
    }

    fn args(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    fn echo_descriptor() -> ToolDescriptor {
        ToolDescriptor::builder("echo", "Echo the input")
            .required_param("text", "string", "Text to echo")
            .build()
    }

    #[test]
    fn test_sync_handler_resolves() {
        let tool = Tool::sync(echo_descriptor(), |p: EchoParams| Ok(p.text));
        let result = tokio_test::block_on(tool.handler().invoke(args(json!({ "text": "hi" }))));
        assert_eq!(result.unwrap(), "hi");
    }

    #[tokio::test]
    async fn test_async_handler_resolves() {
        let tool = Tool::asynchronous(echo_descriptor(), |p: EchoParams| async move {
            tokio::task::yield_now().await;
            Ok(p.text.to_uppercase())
        });
        let result = tool.handler().invoke(args(json!({ "text": "hi" }))).await;
        assert_eq!(result.unwrap(), "HI");
    }

    #[tokio::test]
    async fn test_decode_failures_are_invalid_arguments() {
        let tool = Tool::sync(echo_descriptor(), |p: EchoParams| Ok(p.text));

        for bad in [json!({}), json!({ "text": 5 }), json!({ "text": "a", "extra": 1 })] {
            let err = tool.handler().invoke(args(bad)).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments(_)), "{err:?}");
        }
    }

    #[test]
    fn test_sync_handler_is_deferred_until_polled() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        let tool = Tool::sync(echo_descriptor(), move |p: EchoParams| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(p.text)
        });

        let future = tool.handler().invoke(args(json!({ "text": "x" })));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        tokio_test::block_on(future).unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
