use async_trait::async_trait;
use organix_rs_protocol::{ChatProvider, ChatRequest, ProviderError};

/// Chat provider for commands that never talk to a model.
pub(crate) struct OfflineProvider;

#[async_trait]
impl ChatProvider for OfflineProvider {
    async fn complete(&self, _request: &ChatRequest) -> Result<String, ProviderError> {
        Err(ProviderError::Auth(
            "the organix CLI has no chat provider configured".to_string(),
        ))
    }
}
