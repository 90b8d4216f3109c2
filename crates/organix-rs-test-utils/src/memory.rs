use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use organix_rs_config::MemoryConfig;
use organix_rs_memory::{
    InMemoryBackend, ManualClock, MemoryBackend, MemoryError, MemoryKind, MemoryRecord,
    MemoryStore,
};
use organix_rs_protocol::{EmbeddingProvider, ProviderError};
use std::io;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory store with default settings.
pub async fn memory_store() -> Arc<MemoryStore> {
    Arc::new(
        MemoryStore::in_memory(&MemoryConfig::default())
            .await
            .expect("in-memory store"),
    )
}

/// In-memory store driven by a manual clock.
pub async fn memory_store_with_clock(clock: Arc<ManualClock>) -> Arc<MemoryStore> {
    Arc::new(
        MemoryStore::builder(MemoryConfig::default())
            .backend(Arc::new(InMemoryBackend::new()))
            .clock(clock)
            .build()
            .await
            .expect("in-memory store"),
    )
}

/// Manual clock starting at the given UTC date, midnight.
pub fn clock_at(year: i32, month: u32, day: u32) -> Arc<ManualClock> {
    let start = Utc
        .with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .expect("valid date");
    Arc::new(ManualClock::new(start))
}

/// Backend that loads seeded records but rejects every write.
#[derive(Debug, Clone, Default)]
pub struct FailingBackend {
    records: Vec<MemoryRecord>,
}

impl FailingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<MemoryRecord>) -> Self {
        Self { records }
    }

    fn error() -> MemoryError {
        MemoryError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "read-only disk"))
    }
}

#[async_trait]
impl MemoryBackend for FailingBackend {
    async fn load(&self) -> Result<Vec<MemoryRecord>, MemoryError> {
        Ok(self.records.clone())
    }

    async fn insert(&self, _record: &MemoryRecord) -> Result<(), MemoryError> {
        Err(Self::error())
    }

    async fn update(&self, _records: &[MemoryRecord]) -> Result<(), MemoryError> {
        Err(Self::error())
    }

    async fn remove(&self, _kind: MemoryKind, _ids: &[Uuid]) -> Result<usize, MemoryError> {
        Err(Self::error())
    }
}

/// Embedder that is always unavailable.
#[derive(Debug, Clone)]
pub struct FailingEmbedder {
    dimensions: usize,
}

impl FailingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::Transient("embedding service down".to_string()))
    }
}
