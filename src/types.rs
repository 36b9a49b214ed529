//! Core Data Type Definitions
//!
//! The canonical request/response model consumed by the gateway core. Inbound
//! wire dialects are normalized into these types upstream; provider clients
//! translate them into their own wire formats.
//!
//! ## Module Organization
//!
//! - **`provider`** - Provider identity (`ProviderType`, `ProviderFamily`)
//! - **`chat`** - Messages, `ChatRequest`, `ChatResponse`, token `Usage`
//! - **`embedding`** - `EmbeddingRequest` / `EmbeddingResponse`
//! - **`models`** - Model metadata returned by `list_models`

pub mod chat;
pub mod embedding;
pub mod models;
pub mod provider;

pub use chat::{ChatMessage, ChatRequest, ChatResponse, FinishReason, MessageRole, Usage};
pub use embedding::{EmbeddingRequest, EmbeddingResponse, EmbeddingUsage};
pub use models::ModelInfo;
pub use provider::{OperationKind, ProviderFamily, ProviderType};
