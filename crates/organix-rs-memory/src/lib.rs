//! Tiered memory store for OrganiX agents.

pub mod backend;
pub mod cache;
pub mod clock;
pub mod embedding;
pub mod error;
pub mod model;
pub mod policy;
pub mod recall;
pub mod store;

/// Persistence backends.
pub use backend::{FileMemoryBackend, InMemoryBackend, MemoryBackend};
/// Cache counters reported by stats.
pub use cache::CacheStats;
/// Time sources.
pub use clock::{Clock, ManualClock, SystemClock};
/// Built-in deterministic embedder.
pub use embedding::{HashingEmbedder, cosine_similarity};
/// Memory error type.
pub use error::MemoryError;
/// Memory record model.
pub use model::{Importance, MemoryKind, MemoryRecord, Metadata, ScoredMemory};
/// Retention policy.
pub use policy::RetentionPolicy;
/// Store and reporting types.
pub use store::{KindStats, MemoryStats, MemoryStore, MemoryStoreBuilder};
