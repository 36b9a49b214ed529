//! # llm-relay - Provider routing core for LLM gateways
//!
//! llm-relay sits between a gateway front end and a set of LLM backends. For
//! every call it decides which providers may serve the request, tries them one
//! at a time until one succeeds, and reports a classified outcome.
//!
#![deny(unsafe_code)]

//! ## Features
//!
//! - **Provider Selection**: Filters configured providers by enablement, capability and model
//!   allowlist, then orders them by priority.
//! - **Circuit Breaking**: Providers that fail repeatedly are skipped until a cool-down elapses.
//! - **Sequential Failover**: Candidates are tried strictly in order, never concurrently.
//! - **Atomic Streaming**: A streamed answer is only delivered once a provider finished it cleanly.
//! - **Cancellation and Deadlines**: Every call is bounded by a caller handle and a global timeout.
//! - **Library First**: No HTTP surface, persistence or wire protocol lives in this crate.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use llm_relay::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), LlmError> {
//!     let config = GatewayConfig::from_json_file("gateway.json")?;
//!     config.validate_config()?;
//!
//!     let registry = ProviderRegistry::new(config.providers.clone())
//!         .with_builder(Arc::new(MyOpenAiBuilder));
//!     let orchestrator = ProviderOrchestrator::new(config, Arc::new(registry));
//!
//!     let request = ChatRequest::new("gpt-4o", vec![ChatMessage::user("Hello")]);
//!     let outcome = orchestrator
//!         .execute_completion(&request, None, &CancelHandle::new())
//!         .await;
//!     if let Some(response) = outcome.data {
//!         println!("{}: {}", outcome.correlation_id, response.content);
//!     }
//!     Ok(())
//! }
//! ```

pub mod circuit;
pub mod config;
pub mod error;
pub mod factory;
pub mod failover;
pub mod observability;
pub mod orchestrator;
pub mod selection;
pub mod streaming;
pub mod traits;
pub mod types;
pub mod utils;

pub use error::LlmError;
pub use orchestrator::{ExecutionContext, Outcome, ProviderOrchestrator};

pub mod prelude {
    //! Everything a host needs to configure and call the orchestrator.

    pub use crate::circuit::{BlacklistInfo, CircuitState, CircuitTracker, InMemoryCircuitTracker};
    pub use crate::config::{CircuitBreakerConfig, GatewayConfig, ProviderConfig, RoutingConfig};
    pub use crate::error::{ErrorCategory, LlmError, OrchestratorErrorCode};
    pub use crate::factory::{ClientFactory, ProviderBuilder, ProviderRegistry, RegistryOptions};
    pub use crate::failover::FailoverAttempt;
    pub use crate::orchestrator::{
        ExecutionContext, ExecutionMetrics, Outcome, OutcomeStream, ProviderHealthStatus,
        ProviderOrchestrator,
    };
    pub use crate::streaming::{ChatStream, chat_stream_from_items};
    pub use crate::traits::{
        ChatCapability, EmbeddingCapability, ProviderCapabilities, ProviderClient,
    };
    pub use crate::types::{
        ChatMessage, ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse,
        EmbeddingUsage, FinishReason, MessageRole, ModelInfo, OperationKind, ProviderFamily,
        ProviderType, Usage,
    };
    pub use crate::utils::cancel::CancelHandle;
}
