//! Tool-assisted agent turns.

use super::{Coordinator, metadata, turn_metadata, validate_query};
use crate::error::CoreError;
use crate::types::{ToolAssistedResponse, ToolOutcome};
use log::{debug, warn};
use organix_rs_memory::MemoryKind;
use organix_rs_protocol::{ChatRequest, ToolCall, ToolError};
use organix_rs_tools::{Tool, ToolRegistry, ToolSpec};
use serde_json::{Value, json};
use std::sync::Arc;

const TOOL_USAGE_IMPORTANCE: u8 = 2;

impl Coordinator {
    /// Run the requested tools, then let the persona narrate the results.
    ///
    /// Tool failures become failed [`ToolOutcome`]s for the persona to explain;
    /// only a missing agent, an empty query or a provider failure fail the
    /// call.
    pub async fn process_with_tools(
        &self,
        agent_id: &str,
        query: &str,
        calls: Vec<ToolCall>,
    ) -> Result<ToolAssistedResponse, CoreError> {
        let persona = self.persona(agent_id)?;
        validate_query(query)?;
        self.stats.record_agent(agent_id);

        let mut tool_results = Vec::with_capacity(calls.len());
        for call in calls {
            let outcome = match self.tools.invoke(&call.name, call.args).await {
                Ok(output) => {
                    self.record_tool_usage(agent_id, &call.name, query).await;
                    ToolOutcome {
                        tool: call.name,
                        success: true,
                        output,
                    }
                }
                Err(err) => {
                    warn!(
                        "tool call failed during turn (agent_id={}, tool={}, error={})",
                        agent_id, call.name, err
                    );
                    ToolOutcome {
                        output: json!({ "error": tool_error_message(&err) }),
                        tool: call.name,
                        success: false,
                    }
                }
            };
            tool_results.push(outcome);
        }

        let system_prompt = format!(
            "{}\n\nAvailable tools:\n{}",
            persona.system_prompt,
            tool_listing(&self.tools.specs())
        );
        let message = format!(
            "Original query: {query}\n\nTool results:\n{}\n\n\
             Please analyze these results and provide a helpful, coherent response to the \
             original query.",
            render_results(&tool_results)
        );
        let response = self
            .complete(&ChatRequest::new(system_prompt, message))
            .await?;

        let tools_used = tool_results
            .iter()
            .map(|outcome| outcome.tool.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let mut response_metadata = turn_metadata("tool_response", agent_id, &persona.name);
        response_metadata.insert("tools_used".to_string(), Value::from(tools_used));
        self.persist_exchange(
            query,
            turn_metadata("agent_query", agent_id, &persona.name),
            &response,
            response_metadata,
            self.config.turn_importance,
        )
        .await;

        Ok(ToolAssistedResponse {
            agent_id: agent_id.to_string(),
            agent_name: persona.name,
            response,
            tool_results,
        })
    }

    /// Register a tool with this coordinator's registry.
    pub fn register_tool(&self, tool: Arc<dyn Tool>) {
        self.tools.register(tool);
    }

    /// Registered tool names, sorted.
    pub fn list_tools(&self) -> Vec<String> {
        self.tools.list()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    async fn record_tool_usage(&self, agent_id: &str, tool: &str, query: &str) {
        let stored = self
            .persist_as(
                MemoryKind::Procedural,
                &format!("Used tool {tool} for: {query}"),
                metadata(&[
                    ("type", "tool_usage"),
                    ("tool", tool),
                    ("agent_id", agent_id),
                ]),
                TOOL_USAGE_IMPORTANCE,
            )
            .await;
        if stored.is_some() {
            debug!("recorded tool usage (agent_id={}, tool={})", agent_id, tool);
        }
    }
}

fn tool_listing(specs: &[ToolSpec]) -> String {
    if specs.is_empty() {
        return "(none)".to_string();
    }
    specs
        .iter()
        .map(|spec| spec.summary_line())
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_results(results: &[ToolOutcome]) -> String {
    serde_json::to_string_pretty(results).unwrap_or_default()
}

fn tool_error_message(err: &ToolError) -> String {
    match err {
        ToolError::Execution { source, .. } => source.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::coordinator::Coordinator;
    use crate::error::CoreError;
    use chrono::{DateTime, Utc};
    use organix_rs_memory::MemoryKind;
    use organix_rs_protocol::{ToolCall, ToolError};
    use organix_rs_test_utils::{DummyTool, FailingTool, RecordingLLM, memory_store};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn call(name: &str) -> ToolCall {
        ToolCall::new(name, json!({}))
    }

    #[tokio::test]
    async fn tool_results_are_narrated_and_logged() {
        let llm = Arc::new(RecordingLLM::new("Your balance is 3 SOL."));
        let store = memory_store().await;
        let coordinator = Coordinator::new(llm.clone(), store.clone()).expect("build");
        let wallet = DummyTool::new("wallet_balance")
            .with_description("Read a wallet balance")
            .with_result(json!({ "sol": 3 }));
        coordinator.register_tool(Arc::new(wallet.clone()));
        coordinator.register_tool(Arc::new(FailingTool::new("price_feed", "feed offline")));

        let reply = coordinator
            .process_with_tools(
                "blockchain",
                "what is my balance worth",
                vec![
                    ToolCall::new("wallet_balance", json!({ "address": "me" })),
                    call("price_feed"),
                    call("missing"),
                ],
            )
            .await
            .expect("turn");

        assert_eq!(reply.response, "Your balance is 3 SOL.");
        let successes = reply
            .tool_results
            .iter()
            .map(|outcome| (outcome.tool.as_str(), outcome.success))
            .collect::<Vec<_>>();
        assert_eq!(
            successes,
            vec![("wallet_balance", true), ("price_feed", false), ("missing", false)]
        );
        assert_eq!(reply.tool_results[1].output, json!({ "error": "feed offline" }));

        let request = llm.last_request().expect("request");
        assert!(request.system_prompt.contains("Available tools:\n"));
        assert!(request.system_prompt.contains("- wallet_balance: Read a wallet balance"));
        assert!(request.message.contains("\"sol\": 3"));
        assert_eq!(
            reply.tool_results[2].output,
            json!({ "error": ToolError::NotFound("missing".to_string()).to_string() })
        );

        assert_eq!(wallet.received(), vec![json!({ "address": "me" })]);
        assert_eq!(coordinator.tools().stats()["wallet_balance"].usage_count, 1);
        let procedural = store
            .retrieve_by_timeframe(DateTime::<Utc>::MIN_UTC, None, Some(MemoryKind::Procedural), 10)
            .await
            .expect("timeframe");
        assert_eq!(procedural.len(), 1);
        assert_eq!(procedural[0].metadata_str("tool"), Some("wallet_balance"));
    }

    #[tokio::test]
    async fn unknown_agent_fails_before_any_tool_runs() {
        let coordinator = Coordinator::new(Arc::new(RecordingLLM::new("x")), memory_store().await)
            .expect("build");
        coordinator.register_tool(Arc::new(DummyTool::new("noop")));
        let err = coordinator
            .process_with_tools("ghost", "anything", vec![call("noop")])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AgentNotFound(_)));
        assert_eq!(coordinator.tools().stats()["noop"].usage_count, 0);
        assert_eq!(coordinator.list_tools(), vec!["noop"]);
    }
}
