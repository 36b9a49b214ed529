//! Core error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fault raised by a provider client, the client factory, or configuration loading.
///
/// `Clone` so every failover attempt can keep the fault it captured.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum LlmError {
    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Non-success response returned by the provider API
    #[error("API error {code}: {message}")]
    ApiError {
        code: u16,
        message: String,
        details: Option<String>,
    },

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    #[error("Request timed out: {0}")]
    TimeoutError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Fault while reading a streaming response
    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    /// Malformed request, detected before dispatch
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The client does not implement the requested operation
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Provider type unknown to the factory, not configured, or disabled
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Model not supported: {0}")]
    ModelNotSupported(String),

    /// Provider-specific failure that does not fit another variant
    #[error("{provider} error: {message}")]
    ProviderError { provider: String, message: String },

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Coarse classification of a provider fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Authentication,
    RateLimit,
    Client,
    Server,
    Stream,
    Configuration,
    Unsupported,
    Internal,
}

impl LlmError {
    /// Build an API error without details.
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Build a provider-specific error.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_) | Self::TimeoutError(_) | Self::ConnectionError(_) => {
                ErrorCategory::Network
            }
            Self::AuthenticationError(_) => ErrorCategory::Authentication,
            Self::RateLimitError(_) => ErrorCategory::RateLimit,
            Self::ApiError { code, .. } => match code {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                400..=499 => ErrorCategory::Client,
                _ => ErrorCategory::Server,
            },
            Self::StreamError(_) | Self::ParseError(_) => ErrorCategory::Stream,
            Self::InvalidInput(_) => ErrorCategory::Client,
            Self::ConfigurationError(_) => ErrorCategory::Configuration,
            Self::UnsupportedOperation(_)
            | Self::UnsupportedProvider(_)
            | Self::ModelNotSupported(_) => ErrorCategory::Unsupported,
            Self::ProviderError { .. } => ErrorCategory::Server,
            Self::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the same request could succeed if sent again later.
    ///
    /// Failover moves to the next provider regardless; this only feeds
    /// logging and health reporting.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network
                | ErrorCategory::RateLimit
                | ErrorCategory::Server
                | ErrorCategory::Stream
        )
    }
}

/// Classified failure reported in a public `Outcome`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorErrorCode {
    /// Selection produced no candidate
    NoProviderAvailable,
    /// No provider can serve the requested operation or model
    NoCompatibleModel,
    /// Every attempted candidate faulted
    AllProvidersFailed,
    /// Malformed request, rejected before dispatch
    InvalidRequest,
    /// The aggregate deadline elapsed
    GlobalTimeout,
    /// Caller-initiated cancellation
    Cancelled,
}

impl OrchestratorErrorCode {
    /// HTTP status the HTTP-facing layer reports for this code.
    pub const fn http_status(self) -> u16 {
        match self {
            Self::NoProviderAvailable => 503,
            Self::NoCompatibleModel => 422,
            Self::AllProvidersFailed => 502,
            Self::InvalidRequest => 400,
            Self::GlobalTimeout => 504,
            Self::Cancelled => 499,
        }
    }
}

impl std::fmt::Display for OrchestratorErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoProviderAvailable => "no_provider_available",
            Self::NoCompatibleModel => "no_compatible_model",
            Self::AllProvidersFailed => "all_providers_failed",
            Self::InvalidRequest => "invalid_request",
            Self::GlobalTimeout => "global_timeout",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}
