//! Core coordination primitives for OrganiX.
//!
//! This crate owns intent classification, the persona registry and the
//! multi-agent coordinator that ties memory, tools and the chat provider
//! together.

pub mod coordinator;
pub mod error;
pub mod intent;
pub mod personas;
pub mod types;

pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use error::CoreError;
pub use intent::{IntentClassifier, IntentResult};
pub use personas::{AgentPersona, AgentRegistry, default_personas};
/// Response payloads returned by coordinator operations.
pub use types::{
    AgentFailure, AgentResponse, CollaborationResponse, CoordinationStats, Reply, RoutedResponse,
    ToolAssistedResponse, ToolOutcome,
};
