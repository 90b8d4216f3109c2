//! Tool registry and built-in tools for OrganiX.

pub mod adaptor;
pub mod builtins;
pub mod registry;
pub mod tool;

/// Closure-backed tool adaptor.
pub use adaptor::FnTool;
/// Built-in tool registration helper.
pub use builtins::{ListFilesTool, RetrieveMemoryTool, register_builtin_tools};
/// Tool registry and usage stats.
pub use registry::{ToolRegistry, ToolStats};
/// Tool trait and spec type.
pub use tool::{Tool, ToolSpec};
