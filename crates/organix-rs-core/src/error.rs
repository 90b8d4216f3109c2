//! Error types for the core coordinator crate.

use crate::types::AgentFailure;
use organix_rs_memory::MemoryError;
use organix_rs_protocol::{ProviderError, ToolError};
use thiserror::Error;

/// Errors returned by classifier, registry and coordinator operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input rejected before any work was done.
    #[error("invalid input: {0}")]
    Validation(String),
    /// Agent id is not registered.
    #[error("unknown agent: {0}")]
    AgentNotFound(String),
    #[error("unknown tool: {0}")]
    ToolNotFound(String),
    #[error("tool execution failed: {0}")]
    ToolExecution(#[source] ToolError),
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
    /// Chat provider failed after retries.
    #[error("provider error: {0}")]
    Provider(String),
    /// Chat provider rejected the credentials.
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
    /// Every collaboration branch failed.
    #[error("all {} collaborating agents failed", .failures.len())]
    CollaborationFailed { failures: Vec<AgentFailure> },
    /// Branches succeeded but the synthesizer did not.
    #[error("synthesis failed: {0}")]
    SynthesisFailed(String),
}

impl From<ProviderError> for CoreError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Transient(message) => Self::Provider(message),
            ProviderError::Auth(message) => Self::Auth(message),
            ProviderError::Timeout(timeout_ms) => Self::Timeout {
                operation: "llm".to_string(),
                timeout_ms,
            },
        }
    }
}

impl From<ToolError> for CoreError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(name) => Self::ToolNotFound(name),
            other => Self::ToolExecution(other),
        }
    }
}
