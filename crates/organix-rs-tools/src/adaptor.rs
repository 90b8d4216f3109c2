//! Adaptor turning async closures into tools.

use crate::Tool;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use organix_rs_protocol::{ToolError, ToolSource};
use serde_json::{Value, json};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

type Handler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync>;

/// Tool backed by an async closure `(args) -> Result<Value, ToolError>`.
#[derive(Clone)]
pub struct FnTool {
    name: String,
    description: String,
    source: ToolSource,
    parameters: Value,
    handler: Handler,
}

impl FnTool {
    /// Create a local tool from a handler.
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            source: ToolSource::Local,
            parameters: json!({ "type": "object" }),
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    pub fn with_source(mut self, source: ToolSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_parameters(mut self, schema: Value) -> Self {
        self.parameters = schema;
        self
    }
}

impl fmt::Debug for FnTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish()
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn source(&self) -> ToolSource {
        self.source
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        (self.handler)(args).await
    }
}
