//! Shared test doubles for OrganiX crates.

pub mod llm;
pub mod memory;
pub mod tools;

pub use llm::{FailingLLM, FixedLLM, FlakyLLM, RecordingLLM, Script, ScriptedLLM};
pub use memory::{
    FailingBackend, FailingEmbedder, clock_at, memory_store, memory_store_with_clock,
};
pub use organix_rs_memory::ManualClock;
pub use tools::{DummyTool, FailingTool};
