//! OrganiX: tiered memory, tools and multi-agent routing behind one
//! dependency.
//!
//! The workspace crates are re-exported under short module names; the types
//! needed to stand up a coordinator are also available at the root.

pub use organix_rs_config as config;
pub use organix_rs_core as core;
pub use organix_rs_memory as memory;
pub use organix_rs_protocol as protocol;
pub use organix_rs_tools as tools;

pub use organix_rs_config::OrganixConfig;
pub use organix_rs_core::{Coordinator, CoordinatorBuilder, CoreError, IntentClassifier, Reply};
pub use organix_rs_memory::{MemoryKind, MemoryStore};
pub use organix_rs_protocol::{ChatProvider, ChatRequest, ProviderError};

/// Install `env_logger` (honouring `RUST_LOG`) when the `logging` feature is
/// on. Safe to call more than once.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::builder()
            .format_timestamp_millis()
            .parse_default_env()
            .try_init();
    }
}
