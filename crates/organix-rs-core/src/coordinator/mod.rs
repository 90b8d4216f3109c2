//! Multi-agent coordinator.
//!
//! A request moves through `classify -> route -> (single | fan-out) ->
//! synthesize -> persist`. Within one agent turn the memory read happens
//! before the provider call, which happens before the turn is persisted, so a
//! turn never sees its own answer as context.

mod collaboration;
mod context;
mod retry;
mod routing;
mod stats;
mod tools;

use crate::error::CoreError;
use crate::intent::{IntentClassifier, IntentResult};
use crate::personas::{AgentPersona, AgentRegistry};
use crate::types::{AgentResponse, CoordinationStats};
use context::format_context;
use log::{debug, info, warn};
use organix_rs_config::{CoordinatorConfig, OrganixConfig};
use organix_rs_memory::{MemoryError, MemoryKind, MemoryStore, Metadata};
use organix_rs_protocol::{AgentId, ChatProvider, ChatRequest};
use organix_rs_tools::ToolRegistry;
use retry::BoundedProvider;
use serde_json::Value;
use stats::StatsRecorder;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Builder for [`Coordinator`].
pub struct CoordinatorBuilder {
    llm: Arc<dyn ChatProvider>,
    memory: Arc<MemoryStore>,
    config: OrganixConfig,
    agents: Option<AgentRegistry>,
    tools: Option<ToolRegistry>,
    classifier: Option<IntentClassifier>,
}

impl CoordinatorBuilder {
    pub fn new(llm: Arc<dyn ChatProvider>, memory: Arc<MemoryStore>) -> Self {
        Self {
            llm,
            memory,
            config: OrganixConfig::default(),
            agents: None,
            tools: None,
            classifier: None,
        }
    }

    pub fn config(mut self, config: OrganixConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default personas.
    pub fn agents(mut self, agents: AgentRegistry) -> Self {
        self.agents = Some(agents);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Build the coordinator. Fails if the fallback agent is not registered.
    pub fn build(self) -> Result<Coordinator, CoreError> {
        let agents = self.agents.unwrap_or_else(AgentRegistry::with_defaults);
        let fallback = &self.config.coordinator.fallback_agent;
        if !agents.contains(fallback) {
            return Err(CoreError::Validation(format!(
                "fallback agent {fallback} is not registered"
            )));
        }
        let tools = self
            .tools
            .unwrap_or_else(|| ToolRegistry::from_config(&self.config.tools));
        let classifier = self
            .classifier
            .unwrap_or_else(|| IntentClassifier::from_config(&self.config.intent));
        info!(
            "coordinator ready (agents={}, tools={}, fallback={})",
            agents.len(),
            tools.list().len(),
            fallback
        );
        Ok(Coordinator {
            config: self.config.coordinator,
            llm: self.llm,
            memory: self.memory,
            agents,
            tools,
            classifier,
            stats: StatsRecorder::default(),
        })
    }
}

/// Routes queries to personas, fans out collaborations and records turns in
/// memory.
///
/// Registries are owned by the instance, so several coordinators can coexist.
pub struct Coordinator {
    config: CoordinatorConfig,
    llm: Arc<dyn ChatProvider>,
    memory: Arc<MemoryStore>,
    agents: AgentRegistry,
    tools: ToolRegistry,
    classifier: IntentClassifier,
    stats: StatsRecorder,
}

impl Coordinator {
    pub fn builder(llm: Arc<dyn ChatProvider>, memory: Arc<MemoryStore>) -> CoordinatorBuilder {
        CoordinatorBuilder::new(llm, memory)
    }

    /// Coordinator with default personas, tools registry and configuration.
    pub fn new(
        llm: Arc<dyn ChatProvider>,
        memory: Arc<MemoryStore>,
    ) -> Result<Self, CoreError> {
        Self::builder(llm, memory).build()
    }

    /// Answer `query` as the persona `agent_id`.
    ///
    /// Memory failures only cost context or persistence; provider failures
    /// (after retries) fail the turn and nothing is persisted.
    pub async fn process_with_agent(
        &self,
        agent_id: &str,
        query: &str,
    ) -> Result<AgentResponse, CoreError> {
        self.agent_turn(agent_id, query, query).await
    }

    /// One agent turn. `prompt` is what the provider sees (the query, possibly
    /// extended with caller context); only `query` is recalled against and
    /// persisted.
    async fn agent_turn(
        &self,
        agent_id: &str,
        query: &str,
        prompt: &str,
    ) -> Result<AgentResponse, CoreError> {
        let persona = self.persona(agent_id)?;
        validate_query(query)?;
        self.stats.record_agent(agent_id);

        let mut request = ChatRequest::new(persona.system_prompt.clone(), prompt);
        if let Some(context) = self.recall_context(query).await {
            request = request.with_context(context);
        }
        let response = self.complete(&request).await?;

        let (query_memory_id, response_memory_id) = self
            .persist_exchange(
                query,
                turn_metadata("agent_query", agent_id, &persona.name),
                &response,
                turn_metadata("agent_response", agent_id, &persona.name),
                self.config.turn_importance,
            )
            .await;
        debug!(
            "agent turn complete (agent_id={}, response_chars={})",
            agent_id,
            response.chars().count()
        );
        Ok(AgentResponse {
            agent_id: agent_id.to_string(),
            agent_name: persona.name,
            response,
            query_memory_id,
            response_memory_id,
        })
    }

    /// Insert or replace a persona.
    pub fn register_agent(
        &self,
        agent_id: impl Into<AgentId>,
        persona: AgentPersona,
    ) -> Result<(), CoreError> {
        self.agents.register(agent_id, persona)
    }

    pub fn get_agent(&self, agent_id: &str) -> Option<AgentPersona> {
        self.agents.get(agent_id)
    }

    /// Registered personas sorted by id.
    pub fn list_agents(&self) -> Vec<(AgentId, AgentPersona)> {
        self.agents.list()
    }

    pub fn classify(&self, text: &str) -> IntentResult {
        self.classifier.classify(text)
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Digest of recent memories, condensed by the chat provider when it
    /// answers in time. A provider that fails or times out (after retries)
    /// leaves the rendered digest.
    pub async fn summarize_memories(
        &self,
        kind: Option<MemoryKind>,
        timeframe_days: u32,
        limit: usize,
    ) -> Result<String, CoreError> {
        let condenser = self.bounded_llm();
        let condenser: &dyn ChatProvider = &condenser;
        let summary = self
            .memory
            .summarize(kind, timeframe_days, limit, Some(condenser))
            .await?;
        Ok(summary)
    }

    pub fn stats(&self) -> CoordinationStats {
        self.stats.snapshot(&self.agents.ids())
    }

    fn persona(&self, agent_id: &str) -> Result<AgentPersona, CoreError> {
        self.agents
            .get(agent_id)
            .ok_or_else(|| CoreError::AgentNotFound(agent_id.to_string()))
    }

    /// Relevant memory rendered as context. Failures degrade to no context.
    async fn recall_context(&self, query: &str) -> Option<String> {
        let recalled = self
            .with_memory_timeout(
                "recall",
                self.memory
                    .retrieve_relevant(query, None, self.config.context_limit, 0),
            )
            .await;
        match recalled {
            Ok(records) => format_context(&records),
            Err(err) => {
                warn!("memory recall failed; continuing without context (error={})", err);
                None
            }
        }
    }

    /// One provider completion bounded by the LLM timeout, with retries.
    async fn complete(&self, request: &ChatRequest) -> Result<String, CoreError> {
        Ok(self.bounded_llm().complete(request).await?)
    }

    fn bounded_llm(&self) -> BoundedProvider<'_> {
        BoundedProvider {
            llm: self.llm.as_ref(),
            retry: &self.config.retry,
            timeout_ms: self.config.llm_timeout_ms,
        }
    }

    /// Persist a query and its answer; the answer links back to the query.
    /// Failures are logged and reported as missing ids.
    async fn persist_exchange(
        &self,
        query: &str,
        query_metadata: Metadata,
        response: &str,
        mut response_metadata: Metadata,
        importance: u8,
    ) -> (Option<Uuid>, Option<Uuid>) {
        let query_id = self.persist(query, query_metadata, importance).await;
        if let Some(id) = query_id {
            response_metadata.insert("query_memory_id".to_string(), Value::from(id.to_string()));
        }
        let response_id = self.persist(response, response_metadata, importance).await;
        (query_id, response_id)
    }

    async fn persist(&self, content: &str, metadata: Metadata, importance: u8) -> Option<Uuid> {
        self.persist_as(MemoryKind::Episodic, content, metadata, importance)
            .await
    }

    async fn persist_as(
        &self,
        kind: MemoryKind,
        content: &str,
        metadata: Metadata,
        importance: u8,
    ) -> Option<Uuid> {
        let category = metadata
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("untyped")
            .to_string();
        let stored = self
            .with_memory_timeout(
                "persist",
                self.memory.add(kind, content, metadata, importance),
            )
            .await;
        match stored {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(
                    "failed to persist memory (kind={}, type={}, error={})",
                    kind, category, err
                );
                None
            }
        }
    }

    async fn with_memory_timeout<T, F>(&self, operation: &str, future: F) -> Result<T, CoreError>
    where
        F: Future<Output = Result<T, MemoryError>>,
    {
        match tokio::time::timeout(self.memory_timeout(), future).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CoreError::Timeout {
                operation: format!("memory {operation}"),
                timeout_ms: self.config.memory_timeout_ms,
            }),
        }
    }

    fn llm_timeout(&self) -> Duration {
        Duration::from_millis(self.config.llm_timeout_ms)
    }

    fn memory_timeout(&self) -> Duration {
        Duration::from_millis(self.config.memory_timeout_ms)
    }
}

fn validate_query(query: &str) -> Result<(), CoreError> {
    if query.trim().is_empty() {
        return Err(CoreError::Validation("query is empty".to_string()));
    }
    Ok(())
}

fn turn_metadata(category: &str, agent_id: &str, agent_name: &str) -> Metadata {
    metadata(&[
        ("type", category),
        ("agent_id", agent_id),
        ("agent_name", agent_name),
    ])
}

fn metadata(pairs: &[(&str, &str)]) -> Metadata {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), Value::from(*value)))
        .collect()
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
