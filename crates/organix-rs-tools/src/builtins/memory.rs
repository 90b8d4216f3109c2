//! Memory recall tool backed by the shared memory store.

use crate::Tool;
use crate::builtins::utils::parse_args;
use async_trait::async_trait;
use organix_rs_memory::{MemoryKind, MemoryStore};
use organix_rs_protocol::ToolError;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;

const DEFAULT_LIMIT: usize = 5;

/// Retrieves memories relevant to a query.
#[derive(Clone)]
pub struct RetrieveMemoryTool {
    store: Arc<MemoryStore>,
}

impl RetrieveMemoryTool {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

impl fmt::Debug for RetrieveMemoryTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrieveMemoryTool")
            .field("records", &self.store.len())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct RetrieveMemoryArgs {
    query: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    min_importance: Option<u8>,
}

#[async_trait]
impl Tool for RetrieveMemoryTool {
    fn name(&self) -> &str {
        "retrieve_memory"
    }

    fn description(&self) -> &str {
        "Retrieve memories relevant to a query"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": { "type": "string" },
                "kind": { "type": "string", "enum": ["episodic", "semantic", "procedural"] },
                "limit": { "type": "integer" },
                "min_importance": { "type": "integer", "minimum": 0, "maximum": 5 }
            }
        })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let input: RetrieveMemoryArgs = parse_args(args)?;
        let kind = input
            .kind
            .as_deref()
            .map(str::parse::<MemoryKind>)
            .transpose()
            .map_err(|err| ToolError::InvalidArgs(err.to_string()))?;
        let results = self
            .store
            .retrieve_relevant(
                &input.query,
                kind,
                input.limit.unwrap_or(DEFAULT_LIMIT),
                input.min_importance.unwrap_or(0),
            )
            .await
            .map_err(|err| ToolError::execution(self.name(), err))?;
        let memories = results
            .into_iter()
            .map(|hit| {
                json!({
                    "id": hit.record.id,
                    "kind": hit.record.kind,
                    "content": hit.record.content,
                    "importance": hit.record.importance,
                    "score": hit.score,
                })
            })
            .collect::<Vec<_>>();
        Ok(json!({ "memories": memories }))
    }
}
