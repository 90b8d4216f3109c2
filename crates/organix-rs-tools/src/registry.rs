//! Registry for tool implementations with usage accounting.

use crate::adaptor::FnTool;
use crate::tool::{Tool, ToolSpec};
use log::{debug, warn};
use organix_rs_config::ToolsConfig;
use organix_rs_protocol::{ToolError, ToolSource};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Usage counters for one registered tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStats {
    pub usage_count: u64,
    pub source: ToolSource,
}

#[derive(Clone)]
struct ToolEntry {
    tool: Arc<dyn Tool>,
    usage: Arc<AtomicU64>,
}

/// In-memory registry for tool implementations.
///
/// Cloning shares the underlying map, so every clone sees the same tools and
/// counters.
#[derive(Clone)]
pub struct ToolRegistry {
    /// Map of tool name to implementation.
    tools: Arc<RwLock<HashMap<String, ToolEntry>>>,
    /// Deadline for a single handler call.
    timeout: Duration,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::from_config(&ToolsConfig::default())
    }
}

impl ToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::with_timeout(Duration::from_millis(config.timeout_ms))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            tools: Arc::new(RwLock::new(HashMap::new())),
            timeout,
        }
    }

    /// Register a tool by name. A tool with the same name is replaced and
    /// its usage counter starts over.
    pub fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        let entry = ToolEntry {
            tool,
            usage: Arc::new(AtomicU64::new(0)),
        };
        if self.tools.write().insert(name.clone(), entry).is_some() {
            debug!("replaced tool (name={})", name);
        } else {
            debug!("registering tool (name={})", name);
        }
    }

    /// Register an async closure as a tool.
    pub fn register_fn<F, Fut>(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        source: ToolSource,
        handler: F,
    ) where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        self.register(Arc::new(
            FnTool::new(name, description, handler).with_source(source),
        ));
    }

    /// Invoke a tool by name.
    ///
    /// The usage counter moves only when the handler succeeds. Handler
    /// failures come back as `ToolError::Execution` carrying the tool name.
    pub async fn invoke(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let entry = self
            .tools
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let outcome = tokio::time::timeout(self.timeout, entry.tool.call(args)).await;
        match outcome {
            Ok(Ok(value)) => {
                let count = entry.usage.fetch_add(1, Ordering::AcqRel) + 1;
                debug!("tool invoked (name={}, usage_count={})", name, count);
                Ok(value)
            }
            Ok(Err(err)) => {
                warn!("tool failed (name={}, error={})", name, err);
                Err(match err {
                    ToolError::Execution { .. } | ToolError::Timeout { .. } => err,
                    other => ToolError::execution(name, other),
                })
            }
            Err(_) => {
                let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!("tool timed out (name={}, timeout_ms={})", name, timeout_ms);
                Err(ToolError::Timeout {
                    tool: name.to_string(),
                    timeout_ms,
                })
            }
        }
    }

    /// Fetch a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(name).map(|entry| entry.tool.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.read().contains_key(name)
    }

    /// List all registered tool names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names = self.tools.read().keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    /// Return tool specs for all registered tools, sorted by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs = self
            .tools
            .read()
            .values()
            .map(|entry| entry.tool.spec())
            .collect::<Vec<_>>();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// Usage counters keyed by tool name.
    pub fn stats(&self) -> BTreeMap<String, ToolStats> {
        self.tools
            .read()
            .iter()
            .map(|(name, entry)| {
                (
                    name.clone(),
                    ToolStats {
                        usage_count: entry.usage.load(Ordering::Acquire),
                        source: entry.tool.source(),
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::ToolRegistry;
    use organix_rs_protocol::{ToolError, ToolSource};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::error::Error;
    use std::time::Duration;

    fn registry() -> ToolRegistry {
        let registry = ToolRegistry::new();
        registry.register_fn("echo", "echo args", ToolSource::Local, |args| async move {
            Ok(args)
        });
        registry.register_fn("boom", "always fails", ToolSource::External, |_args| async move {
            Err(ToolError::InvalidArgs("bad input".to_string()))
        });
        registry
    }

    #[test]
    fn registry_lists_tools_and_specs() {
        let registry = registry();
        assert_eq!(registry.list(), vec!["boom", "echo"]);
        let sources = registry
            .specs()
            .into_iter()
            .map(|spec| spec.source)
            .collect::<Vec<_>>();
        assert_eq!(sources, vec![ToolSource::External, ToolSource::Local]);
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let err = registry().invoke("missing", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "missing"));
    }

    #[tokio::test]
    async fn usage_counts_only_successes() {
        let registry = registry();
        registry.invoke("echo", json!({ "n": 1 })).await.expect("echo");
        registry.invoke("echo", json!({ "n": 2 })).await.expect("echo");
        let err = registry.invoke("boom", json!({})).await.unwrap_err();

        match err {
            ToolError::Execution { tool, source } => {
                assert_eq!(tool, "boom");
                assert_eq!(source.to_string(), "invalid arguments: bad input");
            }
            other => panic!("unexpected error: {other}"),
        }
        let stats = registry.stats();
        assert_eq!(stats["echo"].usage_count, 2);
        assert_eq!(stats["boom"].usage_count, 0);
        assert_eq!(stats["boom"].source, ToolSource::External);
    }

    #[tokio::test]
    async fn re_registration_replaces_handler() {
        let registry = registry();
        registry.invoke("echo", json!({})).await.expect("echo");
        registry.register_fn("echo", "constant", ToolSource::Local, |_args| async move {
            Ok(json!("constant"))
        });
        assert_eq!(
            registry.invoke("echo", json!({})).await.expect("echo"),
            json!("constant")
        );
        assert_eq!(registry.stats()["echo"].usage_count, 1);
        assert_eq!(registry.list().len(), 2);
    }

    #[tokio::test]
    async fn slow_handlers_time_out() {
        let registry = ToolRegistry::with_timeout(Duration::from_millis(20));
        registry.register_fn("sleepy", "sleeps", ToolSource::Local, |_args| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(json!(null))
        });
        let err = registry.invoke("sleepy", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout { timeout_ms: 20, .. }));
        assert!(err.source().is_none());
        assert_eq!(registry.stats()["sleepy"].usage_count, 0);
    }
}
