//! Concurrent fan-out to several personas and synthesis of their answers.

use super::context::excerpt;
use super::retry::total_backoff;
use super::{Coordinator, duration_ms, metadata, validate_query};
use crate::error::CoreError;
use crate::personas::AgentPersona;
use crate::types::{AgentFailure, AgentResponse, CollaborationResponse};
use futures_util::future::join_all;
use log::{info, warn};
use organix_rs_protocol::{AgentId, ChatRequest};
use std::time::Duration;

const SYNTHESIZER_NAME: &str = "synthesizer";

impl Coordinator {
    /// Ask several agents concurrently and merge their answers.
    ///
    /// `None` uses the configured collaboration agents. Branches that fail or
    /// time out are excluded; the call fails only when no branch succeeds or
    /// the synthesizer itself fails.
    pub async fn multi_agent_collaboration(
        &self,
        query: &str,
        agent_ids: Option<Vec<AgentId>>,
    ) -> Result<CollaborationResponse, CoreError> {
        validate_query(query)?;
        let agent_ids =
            dedup(agent_ids.unwrap_or_else(|| self.config.collaboration_agents.clone()));
        if agent_ids.is_empty() {
            return Err(CoreError::Validation(
                "collaboration needs at least one agent".to_string(),
            ));
        }

        let deadline = self.branch_deadline();
        let branches = agent_ids.iter().map(|agent_id| async move {
            let outcome = tokio::time::timeout(deadline, self.process_with_agent(agent_id, query))
                .await
                .unwrap_or_else(|_| {
                    Err(CoreError::Timeout {
                        operation: format!("agent {agent_id}"),
                        timeout_ms: duration_ms(deadline),
                    })
                });
            (agent_id.clone(), outcome)
        });
        let settled = join_all(branches).await;

        let mut contributions: Vec<AgentResponse> = Vec::new();
        let mut failures: Vec<AgentFailure> = Vec::new();
        for (agent_id, outcome) in settled {
            match outcome {
                Ok(response) => contributions.push(response),
                Err(err) => {
                    warn!(
                        "collaboration branch failed (agent_id={}, error={})",
                        agent_id, err
                    );
                    failures.push(AgentFailure {
                        agent_id,
                        error: err.to_string(),
                    });
                }
            }
        }
        self.stats.record_collaboration(failures.len());
        if contributions.is_empty() {
            return Err(CoreError::CollaborationFailed { failures });
        }

        let synthesizer = self.synthesizer()?;
        let prompt = synthesis_prompt(query, &contributions, self.config.synthesis_excerpt_chars);
        let response = self
            .complete(&ChatRequest::new(synthesizer.system_prompt, prompt))
            .await
            .map_err(|err| CoreError::SynthesisFailed(err.to_string()))?;

        let contributing_agents = contributions
            .iter()
            .map(|contribution| contribution.agent_id.clone())
            .collect::<Vec<_>>();
        let participants = contributing_agents.join(",");
        self.persist_exchange(
            query,
            metadata(&[
                ("type", "collaborative_query"),
                ("participating_agents", &participants),
            ]),
            &response,
            metadata(&[
                ("type", "collaborative_response"),
                ("agent_name", SYNTHESIZER_NAME),
                ("participating_agents", &participants),
            ]),
            self.config.collaboration_importance,
        )
        .await;
        info!(
            "collaboration complete (contributors={}, failed={})",
            participants,
            failures.len()
        );

        Ok(CollaborationResponse {
            agent_name: SYNTHESIZER_NAME.to_string(),
            contributing_agents,
            failed_agents: failures,
            response,
        })
    }

    /// Configured synthesizer persona, or the fallback persona when the
    /// synthesizer is not registered.
    fn synthesizer(&self) -> Result<AgentPersona, CoreError> {
        if let Some(persona) = self.agents.get(&self.config.synthesizer_agent) {
            return Ok(persona);
        }
        warn!(
            "synthesizer agent is not registered; using fallback (agent_id={})",
            self.config.synthesizer_agent
        );
        self.persona(&self.config.fallback_agent)
    }

    /// Upper bound for one branch: every provider attempt, the backoff in
    /// between, and the memory read and writes around it.
    fn branch_deadline(&self) -> Duration {
        let attempts = self.config.retry.max_attempts.max(1);
        self.llm_timeout()
            .saturating_mul(attempts)
            .saturating_add(total_backoff(&self.config.retry))
            .saturating_add(self.memory_timeout().saturating_mul(3))
    }
}

fn dedup(agent_ids: Vec<AgentId>) -> Vec<AgentId> {
    let mut unique: Vec<AgentId> = Vec::with_capacity(agent_ids.len());
    for agent_id in agent_ids {
        if !unique.contains(&agent_id) {
            unique.push(agent_id);
        }
    }
    unique
}

fn synthesis_prompt(query: &str, contributions: &[AgentResponse], excerpt_chars: usize) -> String {
    let mut prompt = format!(
        "Original query: {query}\n\n\
         I have received perspectives from multiple specialized agents. \
         Please synthesize these perspectives into a comprehensive response.\n"
    );
    for contribution in contributions {
        prompt.push_str(&format!(
            "\n{}'s perspective:\n{}\n",
            contribution.agent_name,
            excerpt(&contribution.response, excerpt_chars)
        ));
    }
    prompt.push_str(
        "\nPlease create a unified response that incorporates the insights from all \
         specialists and resolves any contradictions.",
    );
    prompt
}
