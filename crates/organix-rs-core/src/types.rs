//! Response payloads and shared types for coordinator operations.

use crate::intent::IntentResult;
use organix_rs_protocol::AgentId;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// One persona's answer to a turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentResponse {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub response: String,
    /// Record id of the persisted query, `None` when persistence failed.
    pub query_memory_id: Option<Uuid>,
    /// Record id of the persisted answer, `None` when persistence failed.
    pub response_memory_id: Option<Uuid>,
}

/// Answer produced by routing a query through the classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutedResponse {
    pub intent: IntentResult,
    #[serde(flatten)]
    pub agent: AgentResponse,
}

/// A collaboration branch that did not produce an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentFailure {
    pub agent_id: AgentId,
    pub error: String,
}

/// Synthesized answer of a multi-agent collaboration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollaborationResponse {
    /// Always `"synthesizer"`.
    pub agent_name: String,
    /// Agents whose answers reached the synthesizer, in request order.
    pub contributing_agents: Vec<AgentId>,
    pub failed_agents: Vec<AgentFailure>,
    pub response: String,
}

/// Result of [`crate::Coordinator::respond`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Reply {
    Single(RoutedResponse),
    Collaborative(CollaborationResponse),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Self::Single(routed) => &routed.agent.response,
            Self::Collaborative(collab) => &collab.response,
        }
    }
}

/// Result of one tool call made on behalf of an agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutcome {
    pub tool: String,
    pub success: bool,
    /// Tool output on success, `{"error": message}` on failure.
    pub output: Value,
}

/// Agent answer built from tool results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolAssistedResponse {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub response: String,
    pub tool_results: Vec<ToolOutcome>,
}

/// Counters reported by [`crate::Coordinator::stats`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoordinationStats {
    /// Routed requests, including auto-collaborations from `respond`.
    pub total_requests: u64,
    /// Turns handled per agent; every registered agent is listed.
    pub agent_usage: BTreeMap<AgentId, u64>,
    /// Requests per primary intent, `"none"` when nothing was detected.
    pub intent_distribution: BTreeMap<String, u64>,
    pub collaborations: u64,
    pub failed_branches: u64,
    /// Mean wall time of routed requests.
    pub avg_response_time_ms: f64,
}
