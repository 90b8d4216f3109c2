//! Agent personas and the registry that holds them.

use crate::error::CoreError;
use log::{debug, info};
use organix_rs_protocol::AgentId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const GENERAL_AGENT: &str = "general";
pub const RESEARCHER_AGENT: &str = "researcher";
pub const CODER_AGENT: &str = "coder";
pub const BLOCKCHAIN_AGENT: &str = "blockchain";
pub const MCP_AGENT: &str = "mcp_specialist";
pub const REASONER_AGENT: &str = "agi_reasoner";

/// Named system-prompt configuration for the chat provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPersona {
    pub name: String,
    pub description: String,
    pub system_prompt: String,
}

impl AgentPersona {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            system_prompt: system_prompt.into(),
        }
    }
}

/// Built-in personas keyed by agent id.
pub fn default_personas() -> Vec<(AgentId, AgentPersona)> {
    vec![
        (
            GENERAL_AGENT.to_string(),
            AgentPersona::new(
                "OrganiX",
                "General assistant used when no specialist fits",
                "You are OrganiX, an advanced AI assistant with multiple specialized capabilities.\n\
                 You can research information, generate code, and analyze a variety of inputs.\n\
                 When responding, prioritize accuracy, clarity, and helpfulness.",
            ),
        ),
        (
            RESEARCHER_AGENT.to_string(),
            AgentPersona::new(
                "Research Specialist",
                "Specialized in deep research and information synthesis",
                "You are a Research Specialist agent within OrganiX.\n\
                 Your primary role is to conduct thorough research on topics and provide comprehensive information.\n\
                 Always cite your sources and consider multiple perspectives on complex topics.\n\
                 When answering questions, prioritize accuracy, thoroughness, and objectivity.",
            ),
        ),
        (
            CODER_AGENT.to_string(),
            AgentPersona::new(
                "Code Specialist",
                "Specialized in generating high-quality code solutions",
                "You are a Code Specialist agent within OrganiX.\n\
                 Your primary role is to generate efficient, well-documented code solutions.\n\
                 When writing code, focus on best practices, maintainability, and performance.\n\
                 Explain your approach clearly and provide context for your implementation decisions.",
            ),
        ),
        (
            BLOCKCHAIN_AGENT.to_string(),
            AgentPersona::new(
                "Blockchain Specialist",
                "Specialized in blockchain technology and decentralized applications",
                "You are a Blockchain Specialist agent within OrganiX.\n\
                 Your primary role is to provide expertise on blockchain technology, focusing on Solana.\n\
                 You can help with wallet connections, NFTs, token information, and transaction analysis.\n\
                 When discussing blockchain topics, prioritize technical accuracy and security.",
            ),
        ),
        (
            MCP_AGENT.to_string(),
            AgentPersona::new(
                "MCP Integration Specialist",
                "Specialized in Model Context Protocol for tool integration",
                "You are an MCP Integration Specialist agent within OrganiX.\n\
                 Your primary role is to help users effectively utilize tools through the Model Context Protocol.\n\
                 You understand how to integrate various tools and APIs into conversational AI.\n\
                 Provide detailed guidance on MCP implementation, best practices, and advanced usage patterns.",
            ),
        ),
        (
            REASONER_AGENT.to_string(),
            AgentPersona::new(
                "AGI Reasoning Specialist",
                "Specialized in complex reasoning and advanced cognition",
                "You are an AGI Reasoning Specialist within OrganiX.\n\
                 Your primary role is to tackle complex problems requiring advanced reasoning capabilities.\n\
                 You excel at breaking down complicated scenarios into manageable components.\n\
                 Use chain-of-thought reasoning, analogical thinking, and first-principles analysis in your responses.\n\
                 When addressing complex topics, show your reasoning process explicitly and consider multiple perspectives.",
            ),
        ),
    ]
}

/// Shared persona registry. Clones see the same entries.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: Arc<RwLock<BTreeMap<AgentId, AgentPersona>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with [`default_personas`].
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry
            .agents
            .write()
            .extend(default_personas());
        registry
    }

    /// Register or replace a persona.
    pub fn register(&self, id: impl Into<AgentId>, persona: AgentPersona) -> Result<(), CoreError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CoreError::Validation("agent id is empty".to_string()));
        }
        if persona.name.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "agent {id} has an empty name"
            )));
        }
        let replaced = self.agents.write().insert(id.clone(), persona).is_some();
        if replaced {
            info!("replaced agent persona (agent_id={})", id);
        } else {
            debug!("registered agent persona (agent_id={})", id);
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<AgentPersona> {
        self.agents.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.agents.read().contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.read().keys().cloned().collect()
    }

    /// All personas sorted by id.
    pub fn list(&self) -> Vec<(AgentId, AgentPersona)> {
        self.agents
            .read()
            .iter()
            .map(|(id, persona)| (id.clone(), persona.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }
}
