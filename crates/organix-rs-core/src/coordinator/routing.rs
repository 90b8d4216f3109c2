//! Intent-based routing and the top-level `respond` entry point.

use super::context::augment_query;
use super::{Coordinator, validate_query};
use crate::error::CoreError;
use crate::intent::{DOMAIN_INTENTS, IntentResult};
use crate::types::{Reply, RoutedResponse};
use log::{debug, info, warn};
use organix_rs_protocol::AgentId;
use std::time::Instant;

impl Coordinator {
    /// Agent for a classification result: the route of the primary intent
    /// when that agent is registered, otherwise the fallback agent.
    pub fn select_agent(&self, intent: &IntentResult) -> AgentId {
        intent
            .primary_intent
            .as_deref()
            .and_then(|label| self.routed_agent(label))
            .unwrap_or_else(|| self.config.fallback_agent.clone())
    }

    /// Classify `query` and answer it with the best matching persona.
    ///
    /// Unmatched intents go to the fallback agent; routing itself never fails.
    pub async fn route_to_best_agent(&self, query: &str) -> Result<RoutedResponse, CoreError> {
        self.route_prompt(query, query).await
    }

    /// Answer `query` with a memory context block appended to the prompt.
    ///
    /// Supplied context is used as-is; otherwise relevant memories of every
    /// kind are recalled. Intent is classified on the bare query, and only the
    /// bare query is remembered, so stored turns never accumulate earlier
    /// context.
    pub async fn process_with_context_awareness(
        &self,
        query: &str,
        context: Option<&str>,
    ) -> Result<RoutedResponse, CoreError> {
        validate_query(query)?;
        let context = match context.map(str::trim).filter(|ctx| !ctx.is_empty()) {
            Some(supplied) => Some(supplied.to_string()),
            None => self.recall_context(query).await,
        };
        match context {
            Some(context) => {
                debug!(
                    "routing with context (context_chars={})",
                    context.chars().count()
                );
                self.route_prompt(query, &augment_query(query, &context))
                    .await
            }
            None => self.route_prompt(query, query).await,
        }
    }

    /// Top-level entry point: fan out when the query spans several domains,
    /// otherwise route to a single agent.
    pub async fn respond(&self, query: &str) -> Result<Reply, CoreError> {
        validate_query(query)?;
        let started = Instant::now();
        let intent = self.classifier.classify(query);
        self.stats.record_request(intent.primary_intent.as_deref());

        let agents = self.domain_agents(&intent);
        let result = if self.config.auto_collaborate && agents.len() >= 2 {
            info!(
                "query spans several domains; collaborating (agents={})",
                agents.join(",")
            );
            self.multi_agent_collaboration(query, Some(agents))
                .await
                .map(Reply::Collaborative)
        } else {
            self.route_classified(query, query, intent)
                .await
                .map(Reply::Single)
        };
        self.stats.record_elapsed(started.elapsed());
        result
    }

    async fn route_prompt(&self, query: &str, prompt: &str) -> Result<RoutedResponse, CoreError> {
        validate_query(query)?;
        let started = Instant::now();
        let intent = self.classifier.classify(query);
        self.stats.record_request(intent.primary_intent.as_deref());
        let result = self.route_classified(query, prompt, intent).await;
        self.stats.record_elapsed(started.elapsed());
        result
    }

    async fn route_classified(
        &self,
        query: &str,
        prompt: &str,
        intent: IntentResult,
    ) -> Result<RoutedResponse, CoreError> {
        let agent_id = self.select_agent(&intent);
        info!(
            "routing query (intent={}, confidence={:.2}, agent_id={})",
            intent.primary_intent.as_deref().unwrap_or("none"),
            intent.confidence,
            agent_id
        );
        let agent = self.agent_turn(&agent_id, query, prompt).await?;
        Ok(RoutedResponse { intent, agent })
    }

    fn routed_agent(&self, label: &str) -> Option<AgentId> {
        let agent_id = self.config.routes.get(label)?;
        if self.agents.contains(agent_id) {
            Some(agent_id.clone())
        } else {
            warn!(
                "route target is not registered; using fallback (intent={}, agent_id={})",
                label, agent_id
            );
            None
        }
    }

    /// Distinct registered agents for the domain intents above threshold.
    fn domain_agents(&self, intent: &IntentResult) -> Vec<AgentId> {
        let mut agents: Vec<AgentId> = Vec::new();
        for label in intent.intents_above(self.classifier.min_confidence()) {
            if !DOMAIN_INTENTS.contains(&label) {
                continue;
            }
            if let Some(agent_id) = self.routed_agent(label)
                && !agents.contains(&agent_id)
            {
                agents.push(agent_id);
            }
        }
        agents
    }
}
