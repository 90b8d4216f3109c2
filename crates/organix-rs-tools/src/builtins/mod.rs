//! Built-in tools bundled with OrganiX.

mod filesystem;
mod memory;
mod utils;

use crate::ToolRegistry;
use log::info;
use organix_rs_memory::MemoryStore;
use std::path::PathBuf;
use std::sync::Arc;

pub use filesystem::ListFilesTool;
pub use memory::RetrieveMemoryTool;

/// Register all built-in tools with the provided registry.
pub fn register_builtin_tools(
    registry: &ToolRegistry,
    store: Arc<MemoryStore>,
    workspace_root: impl Into<PathBuf>,
) {
    registry.register(Arc::new(ListFilesTool::new(workspace_root)));
    registry.register(Arc::new(RetrieveMemoryTool::new(store)));
    info!("registered built-in tools");
}
