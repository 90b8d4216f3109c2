//! Directory listing tool.

use crate::Tool;
use crate::builtins::utils::{parse_args, confine};
use async_trait::async_trait;
use log::debug;
use organix_rs_protocol::ToolError;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::PathBuf;

/// Default maximum number of entries returned.
const DEFAULT_MAX_RESULTS: usize = 200;

/// Lists the entries of a directory under a fixed workspace root.
#[derive(Debug, Clone)]
pub struct ListFilesTool {
    root: PathBuf,
}

impl ListFilesTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[derive(Debug, Deserialize)]
struct ListFilesArgs {
    #[serde(default = "default_directory")]
    directory: String,
    #[serde(default)]
    max_results: Option<usize>,
}

fn default_directory() -> String {
    ".".to_string()
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files in a directory"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "directory": { "type": "string", "description": "Directory relative to the workspace root." },
                "max_results": { "type": "integer", "description": "Maximum number of entries to return." }
            }
        })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let input: ListFilesArgs = parse_args(args)?;
        let dir = confine(&self.root, &input.directory)?;
        let max_results = input.max_results.unwrap_or(DEFAULT_MAX_RESULTS);

        let mut reader = tokio::fs::read_dir(&dir)
            .await
            .map_err(|err| ToolError::execution(self.name(), err))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|err| ToolError::execution(self.name(), err))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry
                .file_type()
                .await
                .map(|kind| kind.is_dir())
                .unwrap_or(false);
            entries.push(if is_dir { format!("{name}/") } else { name });
        }
        entries.sort();
        let truncated = entries.len() > max_results;
        entries.truncate(max_results);
        debug!(
            "listed directory (path={}, entries={}, truncated={})",
            dir.display(),
            entries.len(),
            truncated
        );
        Ok(json!({
            "entries": entries,
            "truncated": truncated,
        }))
    }
}
