//! Collaborator interfaces and shared types for OrganiX.
//!
//! The core never talks to a model vendor, an embedding service, or a tool
//! backend directly. Everything crosses one of the narrow traits defined here.

mod chat;
mod embedding;
mod tool;

pub use chat::{ChatProvider, ChatRequest, ProviderError};
pub use embedding::EmbeddingProvider;
pub use tool::{ToolCall, ToolError, ToolSource};

/// Registry key for an agent persona.
pub type AgentId = String;
