use async_trait::async_trait;
use organix_rs_protocol::{ToolError, ToolSource};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::io;
use std::sync::Arc;

/// Tool answering every call with a canned value and remembering the
/// arguments it was given.
#[derive(Debug, Clone)]
pub struct DummyTool {
    name: String,
    description: String,
    source: ToolSource,
    result: Value,
    received: Arc<Mutex<Vec<Value>>>,
}

impl DummyTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: "dummy".to_string(),
            source: ToolSource::Local,
            result: json!({}),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Arguments of every call so far, oldest first. Clones share the log.
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().clone()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = result;
        self
    }

    pub fn with_source(mut self, source: ToolSource) -> Self {
        self.source = source;
        self
    }
}

#[async_trait]
impl organix_rs_tools::Tool for DummyTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn source(&self) -> ToolSource {
        self.source
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        self.received.lock().push(args);
        Ok(self.result.clone())
    }
}

/// Tool whose handler always fails.
#[derive(Debug, Clone)]
pub struct FailingTool {
    name: String,
    message: String,
}

impl FailingTool {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl organix_rs_tools::Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "always fails"
    }

    async fn call(&self, _args: Value) -> Result<Value, ToolError> {
        Err(ToolError::execution(
            self.name.clone(),
            io::Error::other(self.message.clone()),
        ))
    }
}
