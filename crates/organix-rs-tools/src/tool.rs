use async_trait::async_trait;
use organix_rs_protocol::{ToolError, ToolSource};
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt::Debug;

/// What an agent is told about a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub source: ToolSource,
    /// JSON schema of the argument object.
    pub parameters: Value,
}

impl ToolSpec {
    /// `- name: description`, one line of a prompt tool listing.
    pub fn summary_line(&self) -> String {
        format!("- {}: {}", self.name, self.description)
    }
}

/// A named async handler taking a JSON object of arguments.
#[async_trait]
pub trait Tool: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn source(&self) -> ToolSource {
        ToolSource::Local
    }

    /// Defaults to an unconstrained object.
    fn parameters(&self) -> Value {
        json!({ "type": "object" })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            source: self.source(),
            parameters: self.parameters(),
        }
    }
}
