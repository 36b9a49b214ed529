//! ProviderCapabilities structure

use serde::{Deserialize, Serialize};

use crate::types::OperationKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    pub chat: bool,
    pub streaming: bool,
    pub embedding: bool,
}

impl ProviderCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chat, streaming and embeddings.
    pub fn all() -> Self {
        Self::new().with_chat().with_streaming().with_embedding()
    }

    pub fn with_chat(mut self) -> Self {
        self.chat = true;
        self
    }
    pub fn with_streaming(mut self) -> Self {
        self.streaming = true;
        self
    }
    pub fn with_embedding(mut self) -> Self {
        self.embedding = true;
        self
    }

    pub fn supports(&self, operation: OperationKind) -> bool {
        match operation {
            OperationKind::Chat => self.chat,
            OperationKind::Streaming => self.streaming,
            OperationKind::Embedding => self.embedding,
        }
    }
}
