//! Provider client contract

use async_trait::async_trait;

use super::{ChatCapability, EmbeddingCapability, ProviderCapabilities};
use crate::error::LlmError;
use crate::types::{ModelInfo, ProviderType};
use crate::utils::cancel::CancelHandle;

/// Everything the gateway core needs from one backend adapter.
///
/// Clients are built by a `ClientFactory`, may be cached and shared across
/// concurrent calls, and own their transport concurrency.
#[async_trait]
pub trait ProviderClient: ChatCapability + EmbeddingCapability {
    fn provider_type(&self) -> ProviderType;

    /// Display name, defaults to the provider type name.
    fn name(&self) -> String {
        self.provider_type().to_string()
    }

    fn capabilities(&self) -> ProviderCapabilities;

    /// Liveness probe. `Ok(false)` means reachable but not serving.
    async fn health_check(&self, cancel: &CancelHandle) -> Result<bool, LlmError>;

    async fn list_models(&self, cancel: &CancelHandle) -> Result<Vec<ModelInfo>, LlmError>;
}
