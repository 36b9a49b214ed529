//! Chat capability trait

use async_trait::async_trait;

use crate::error::LlmError;
use crate::streaming::ChatStream;
use crate::types::{ChatRequest, ChatResponse};
use crate::utils::cancel::CancelHandle;

#[async_trait]
pub trait ChatCapability: Send + Sync {
    /// Single-shot completion.
    async fn chat(
        &self,
        request: &ChatRequest,
        cancel: &CancelHandle,
    ) -> Result<ChatResponse, LlmError>;

    /// Streaming completion. Faults may surface either from this call or as
    /// an `Err` item inside the returned stream.
    async fn chat_stream(
        &self,
        request: &ChatRequest,
        cancel: &CancelHandle,
    ) -> Result<ChatStream, LlmError>;
}
