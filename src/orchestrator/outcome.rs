//! Uniform call outcomes and execution metrics.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::OrchestratorErrorCode;
use crate::failover::FailoverAttempt;
use crate::types::{ChatResponse, EmbeddingResponse, ProviderType};

/// Timing and token accounting for one call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    pub total_duration: Duration,
    pub providers_attempted: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u32>,
    /// Time from call start until output was first available to the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_first_output: Option<Duration>,
}

/// Result of a public orchestrator call. Metrics are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<OrchestratorErrorCode>,
    pub correlation_id: String,
    #[serde(default)]
    pub attempts: Vec<FailoverAttempt>,
    pub metrics: ExecutionMetrics,
}

impl<T> Outcome<T> {
    pub fn success(
        data: T,
        provider: ProviderType,
        model: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            data: Some(data),
            provider: Some(provider),
            model: Some(model.into()),
            error: None,
            error_code: None,
            correlation_id: correlation_id.into(),
            attempts: Vec::new(),
            metrics: ExecutionMetrics::default(),
        }
    }

    pub fn failure(
        code: OrchestratorErrorCode,
        message: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            provider: None,
            model: None,
            error: Some(message.into()),
            error_code: Some(code),
            correlation_id: correlation_id.into(),
            attempts: Vec::new(),
            metrics: ExecutionMetrics::default(),
        }
    }

    pub fn with_attempts(mut self, attempts: Vec<FailoverAttempt>) -> Self {
        self.metrics.providers_attempted = attempts.len();
        self.attempts = attempts;
        self
    }

    pub fn with_metrics(mut self, metrics: ExecutionMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// Token counts carried by a provider payload.
pub trait ReportsUsage {
    /// `(input_tokens, output_tokens)`
    fn token_usage(&self) -> (Option<u32>, Option<u32>);
}

impl ReportsUsage for ChatResponse {
    fn token_usage(&self) -> (Option<u32>, Option<u32>) {
        match self.usage {
            Some(usage) => (Some(usage.prompt_tokens), Some(usage.completion_tokens)),
            None => (None, None),
        }
    }
}

impl ReportsUsage for EmbeddingResponse {
    fn token_usage(&self) -> (Option<u32>, Option<u32>) {
        match self.usage {
            Some(usage) => (Some(usage.prompt_tokens), None),
            None => (None, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Usage;

    #[test]
    fn failure_serializes_code_in_snake_case() {
        let outcome: Outcome<ChatResponse> = Outcome::failure(
            OrchestratorErrorCode::AllProvidersFailed,
            "All providers failed",
            "abcd1234",
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["error_code"], "all_providers_failed");
        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
        assert!(json.get("metrics").is_some());
    }

    #[test]
    fn attempts_set_provider_count() {
        let outcome = Outcome::success(1, ProviderType::OpenAi, "m", "id").with_attempts(vec![]);
        assert_eq!(outcome.metrics.providers_attempted, 0);
    }

    #[test]
    fn chat_usage_maps_to_input_and_output() {
        let response = ChatResponse::new("m", "hi").with_usage(Usage::new(12, 3));
        assert_eq!(response.token_usage(), (Some(12), Some(3)));
        assert_eq!(ChatResponse::new("m", "hi").token_usage(), (None, None));
    }
}
