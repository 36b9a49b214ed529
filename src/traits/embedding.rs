//! Embedding capability trait

use async_trait::async_trait;

use crate::error::LlmError;
use crate::types::{EmbeddingRequest, EmbeddingResponse};
use crate::utils::cancel::CancelHandle;

#[async_trait]
pub trait EmbeddingCapability: Send + Sync {
    /// Generate one vector per input. Providers without embeddings keep the default.
    async fn embed(
        &self,
        request: &EmbeddingRequest,
        _cancel: &CancelHandle,
    ) -> Result<EmbeddingResponse, LlmError> {
        Err(LlmError::UnsupportedOperation(format!(
            "embeddings are not supported (model {})",
            request.model
        )))
    }
}
