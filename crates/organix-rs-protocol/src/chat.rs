//! Chat-completion interface consumed by the coordinator and memory digests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Single completion request sent to a chat provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// System prompt describing the persona.
    pub system_prompt: String,
    /// User-facing message for this turn.
    pub message: String,
    /// Optional context block (recalled memory, tool output).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl ChatRequest {
    pub fn new(system_prompt: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            message: message.into(),
            context: None,
        }
    }

    /// Attach a context block, ignoring blank input.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        if !context.trim().is_empty() {
            self.context = Some(context);
        }
        self
    }
}

/// Errors surfaced by chat and embedding providers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Transient failure (rate limit, 5xx, dropped connection).
    #[error("provider error: {0}")]
    Transient(String),
    /// Credentials rejected; retrying cannot help.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The call did not finish within its deadline.
    #[error("provider timed out after {0}ms")]
    Timeout(u64),
}

impl ProviderError {
    /// Whether the failure may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }
}

/// Chat-completion collaborator.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Complete a single request and return the assistant text.
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError>;
}
