//! Error Handling Module
//!
//! This module provides the error types shared by the gateway core:
//! - Provider faults (`LlmError`, `ErrorCategory`) raised by provider clients,
//!   factories and configuration loading
//! - The outcome taxonomy (`OrchestratorErrorCode`) reported to callers
//!
//! Provider faults never cross the public orchestrator boundary as `Err`;
//! they are recorded per attempt and classified into an `OrchestratorErrorCode`.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm_relay::error::{LlmError, ErrorCategory};
//!
//! let error = LlmError::api_error(503, "upstream overloaded");
//! assert_eq!(error.category(), ErrorCategory::Server);
//! assert!(error.is_retryable());
//! ```

pub mod types;

pub use types::*;
