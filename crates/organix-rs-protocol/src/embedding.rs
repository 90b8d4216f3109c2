//! Embedding interface used for memory similarity ranking.

use crate::chat::ProviderError;
use async_trait::async_trait;

/// Text embedding collaborator.
///
/// Implementations must be deterministic: identical input yields an identical
/// vector, and every vector has length [`EmbeddingProvider::dimensions`].
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Fixed output length.
    fn dimensions(&self) -> usize;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}
