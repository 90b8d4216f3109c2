//! Tool invocation types shared by the registry and the coordinator.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Where a tool implementation lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolSource {
    /// In-process handler.
    #[default]
    Local,
    /// Handler backed by a remote service.
    External,
}

impl fmt::Display for ToolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::External => f.write_str("external"),
        }
    }
}

/// Request to invoke a named tool with JSON arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Errors returned by tools and the tool registry.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Tool name was not found in registry.
    #[error("tool not found: {0}")]
    NotFound(String),
    /// Tool received invalid arguments.
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    /// Tool handler failed.
    #[error("tool {tool} failed: {source}")]
    Execution {
        tool: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Tool handler exceeded its deadline.
    #[error("tool {tool} timed out after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u64 },
}

impl ToolError {
    /// Wrap an arbitrary handler failure.
    pub fn execution(
        tool: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Execution {
            tool: tool.into(),
            source: source.into(),
        }
    }
}
