//! Configuration schema for OrganiX.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root config for an OrganiX process.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OrganixConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub intent: IntentConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl OrganixConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> OrganixConfigBuilder {
        OrganixConfigBuilder::new()
    }

    /// Range checks serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let memory = &self.memory;
        if !(1..=5).contains(&memory.protect_importance) {
            return Err(out_of_range("memory.protect_importance", "must be in 1..=5"));
        }
        if memory.embedding_dimensions == 0 {
            return Err(out_of_range("memory.embedding_dimensions", "must be positive"));
        }
        let relevance = &memory.relevance;
        let weights = [
            relevance.similarity_weight,
            relevance.recency_weight,
            relevance.importance_weight,
        ];
        if weights.iter().any(|weight| !weight.is_finite() || *weight < 0.0) {
            return Err(out_of_range("memory.relevance", "weights must be non-negative"));
        }
        if weights.iter().all(|weight| *weight == 0.0) {
            return Err(out_of_range(
                "memory.relevance",
                "needs at least one positive weight",
            ));
        }
        if relevance.recency_half_life_days <= 0.0 {
            return Err(out_of_range(
                "memory.relevance.recency_half_life_days",
                "must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.intent.min_confidence) {
            return Err(out_of_range("intent.min_confidence", "must be in 0.0..=1.0"));
        }

        let coordinator = &self.coordinator;
        if coordinator.fallback_agent.trim().is_empty() {
            return Err(out_of_range("coordinator.fallback_agent", "must not be empty"));
        }
        for (key, importance) in [
            ("coordinator.turn_importance", coordinator.turn_importance),
            (
                "coordinator.collaboration_importance",
                coordinator.collaboration_importance,
            ),
        ] {
            if !(1..=5).contains(&importance) {
                return Err(out_of_range(key, "must be in 1..=5"));
            }
        }
        if !(1..=MAX_RETRY_ATTEMPTS).contains(&coordinator.retry.max_attempts) {
            return Err(out_of_range(
                "coordinator.retry.max_attempts",
                "must be in 1..=10",
            ));
        }
        if coordinator.retry.multiplier < 1.0 {
            return Err(out_of_range("coordinator.retry.multiplier", "must be at least 1.0"));
        }
        Ok(())
    }
}

/// Upper bound on provider attempts per call, retries included.
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

fn out_of_range(key: &str, problem: &str) -> ConfigError {
    ConfigError::bad_value("config", key, problem)
}

/// Builder for assembling an `OrganixConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct OrganixConfigBuilder {
    config: OrganixConfig,
}

impl OrganixConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: OrganixConfig::default(),
        }
    }

    /// Replace the memory store configuration.
    pub fn memory(mut self, memory: MemoryConfig) -> Self {
        self.config.memory = memory;
        self
    }

    /// Replace the intent classifier configuration.
    pub fn intent(mut self, intent: IntentConfig) -> Self {
        self.config.intent = intent;
        self
    }

    /// Replace the coordinator configuration.
    pub fn coordinator(mut self, coordinator: CoordinatorConfig) -> Self {
        self.config.coordinator = coordinator;
        self
    }

    /// Replace the tool registry configuration.
    pub fn tools(mut self, tools: ToolsConfig) -> Self {
        self.config.tools = tools;
        self
    }

    /// Finalize and return the built `OrganixConfig`.
    pub fn build(self) -> OrganixConfig {
        self.config
    }
}

/// Memory store persistence, retention and ranking settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryConfig {
    /// Storage root; defaults to `~/.organix/memory`.
    #[serde(default)]
    pub path: Option<String>,
    /// Default age cutoff used by `prune` when no explicit age is given.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
    /// Records at or above this importance are never pruned by age.
    #[serde(default = "default_protect_importance")]
    pub protect_importance: u8,
    /// Records recalled more often than this are never pruned by age.
    #[serde(default = "default_protect_access_count")]
    pub protect_access_count: Option<u32>,
    /// Upper bound on removals per prune call.
    #[serde(default = "default_max_prune_per_call")]
    pub max_prune_per_call: usize,
    /// Number of recall results kept in the LRU cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Lifetime of a cached recall result.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Vector length of the built-in hashing embedder.
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,
    #[serde(default)]
    pub relevance: RelevanceConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_age_days: default_max_age_days(),
            protect_importance: default_protect_importance(),
            protect_access_count: default_protect_access_count(),
            max_prune_per_call: default_max_prune_per_call(),
            cache_capacity: default_cache_capacity(),
            cache_ttl_secs: default_cache_ttl_secs(),
            embedding_dimensions: default_embedding_dimensions(),
            relevance: RelevanceConfig::default(),
        }
    }
}

fn default_max_age_days() -> u32 {
    30
}

fn default_protect_importance() -> u8 {
    4
}

fn default_protect_access_count() -> Option<u32> {
    Some(5)
}

fn default_max_prune_per_call() -> usize {
    500
}

fn default_cache_capacity() -> usize {
    128
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_embedding_dimensions() -> usize {
    256
}

/// Weights for combining similarity, recency and importance into one score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelevanceConfig {
    #[serde(default = "default_similarity_weight")]
    pub similarity_weight: f32,
    #[serde(default = "default_recency_weight")]
    pub recency_weight: f32,
    #[serde(default = "default_importance_weight")]
    pub importance_weight: f32,
    /// Age at which the recency component halves.
    #[serde(default = "default_recency_half_life_days")]
    pub recency_half_life_days: f32,
    /// Records whose cosine similarity does not exceed this are not recalled.
    #[serde(default)]
    pub min_similarity: f32,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            similarity_weight: default_similarity_weight(),
            recency_weight: default_recency_weight(),
            importance_weight: default_importance_weight(),
            recency_half_life_days: default_recency_half_life_days(),
            min_similarity: 0.0,
        }
    }
}

fn default_similarity_weight() -> f32 {
    0.7
}

fn default_recency_weight() -> f32 {
    0.15
}

fn default_importance_weight() -> f32 {
    0.15
}

fn default_recency_half_life_days() -> f32 {
    30.0
}

/// Intent classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntentConfig {
    /// Minimum match strength for a label to become the primary intent.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
        }
    }
}

fn default_min_confidence() -> f32 {
    0.05
}

/// Routing, fan-out and turn settings for the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoordinatorConfig {
    /// Agent used when no route matches; must be registered.
    #[serde(default = "default_fallback_agent")]
    pub fallback_agent: String,
    /// Agent that merges collaboration branches.
    #[serde(default = "default_synthesizer_agent")]
    pub synthesizer_agent: String,
    /// Agents consulted when a collaboration names none.
    #[serde(default = "default_collaboration_agents")]
    pub collaboration_agents: Vec<String>,
    /// Intent label to agent id.
    #[serde(default = "default_routes")]
    pub routes: BTreeMap<String, String>,
    /// Fan out automatically when a query spans several domains.
    #[serde(default = "default_true")]
    pub auto_collaborate: bool,
    /// Recalled records injected as context per turn.
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
    /// Importance assigned to persisted turns.
    #[serde(default = "default_turn_importance")]
    pub turn_importance: u8,
    /// Importance assigned to persisted collaborations.
    #[serde(default = "default_collaboration_importance")]
    pub collaboration_importance: u8,
    /// Characters of each branch answer passed to the synthesizer.
    #[serde(default = "default_synthesis_excerpt_chars")]
    pub synthesis_excerpt_chars: usize,
    #[serde(default = "default_llm_timeout_ms")]
    pub llm_timeout_ms: u64,
    #[serde(default = "default_memory_timeout_ms")]
    pub memory_timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            fallback_agent: default_fallback_agent(),
            synthesizer_agent: default_synthesizer_agent(),
            collaboration_agents: default_collaboration_agents(),
            routes: default_routes(),
            auto_collaborate: true,
            context_limit: default_context_limit(),
            turn_importance: default_turn_importance(),
            collaboration_importance: default_collaboration_importance(),
            synthesis_excerpt_chars: default_synthesis_excerpt_chars(),
            llm_timeout_ms: default_llm_timeout_ms(),
            memory_timeout_ms: default_memory_timeout_ms(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_fallback_agent() -> String {
    "general".to_string()
}

fn default_synthesizer_agent() -> String {
    "agi_reasoner".to_string()
}

fn default_collaboration_agents() -> Vec<String> {
    vec![
        "researcher".to_string(),
        "coder".to_string(),
        "agi_reasoner".to_string(),
    ]
}

fn default_routes() -> BTreeMap<String, String> {
    [
        ("blockchain", "blockchain"),
        ("web_search", "researcher"),
        ("command", "coder"),
        ("agent_action", "coder"),
        ("mcp", "mcp_specialist"),
        ("reasoning", "agi_reasoner"),
        ("question", "researcher"),
    ]
    .into_iter()
    .map(|(intent, agent)| (intent.to_string(), agent.to_string()))
    .collect()
}

fn default_true() -> bool {
    true
}

fn default_context_limit() -> usize {
    5
}

fn default_turn_importance() -> u8 {
    3
}

fn default_collaboration_importance() -> u8 {
    4
}

fn default_synthesis_excerpt_chars() -> usize {
    500
}

fn default_llm_timeout_ms() -> u64 {
    60_000
}

fn default_memory_timeout_ms() -> u64 {
    5_000
}

/// Exponential backoff for transient provider failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first call.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Single attempt, no backoff.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 0,
            multiplier: 1.0,
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    250
}

fn default_multiplier() -> f32 {
    2.0
}

/// Tool registry settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolsConfig {
    /// Deadline applied to every tool handler call.
    #[serde(default = "default_tool_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_tool_timeout_ms(),
        }
    }
}

fn default_tool_timeout_ms() -> u64 {
    30_000
}
