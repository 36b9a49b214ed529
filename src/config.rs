//! Gateway configuration
//!
//! Loaded from JSON. Durations are written in whole seconds.
//!
//! ```json
//! {
//!   "providers": [
//!     { "provider_type": "openai", "priority": 10, "api_key": "sk-..." },
//!     { "provider_type": "anthropic", "priority": 20, "supports_embeddings": false }
//!   ],
//!   "routing": { "max_providers_to_try": 3 },
//!   "circuit_breaker": { "failure_threshold": 5, "cool_down": 30 },
//!   "default_timeout": 120
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use validator::{Validate, ValidationError};

use crate::error::LlmError;
use crate::types::{OperationKind, ProviderType};

/// Default priority; lower values are preferred.
pub const DEFAULT_PRIORITY: u32 = 100;

/// Top-level gateway configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct GatewayConfig {
    #[validate(nested)]
    pub providers: Vec<ProviderConfig>,

    #[validate(nested)]
    pub routing: RoutingConfig,

    #[validate(nested)]
    pub circuit_breaker: CircuitBreakerConfig,

    /// Deadline for a call when neither the context nor the request sets one
    #[serde(deserialize_with = "duration_secs")]
    #[validate(custom(function = "non_zero_duration"))]
    pub default_timeout: Duration,

    /// Upper bound for one provider's health probe
    #[serde(deserialize_with = "duration_secs")]
    #[validate(custom(function = "non_zero_duration"))]
    pub health_check_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            routing: RoutingConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            default_timeout: Duration::from_secs(120),
            health_check_timeout: Duration::from_secs(10),
        }
    }
}

impl GatewayConfig {
    pub fn new(providers: Vec<ProviderConfig>) -> Self {
        Self {
            providers,
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, LlmError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LlmError::ConfigurationError(format!("Invalid gateway config: {e}")))?;
        config.validate_config()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LlmError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LlmError::ConfigurationError(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    /// Field validation plus cross-provider checks.
    pub fn validate_config(&self) -> Result<(), LlmError> {
        self.validate()
            .map_err(|e| LlmError::ConfigurationError(e.to_string()))?;

        let mut types = HashSet::new();
        let mut names = HashSet::new();
        for provider in &self.providers {
            if !types.insert(provider.provider_type) {
                return Err(LlmError::ConfigurationError(format!(
                    "Provider {} is configured more than once",
                    provider.provider_type
                )));
            }
            if !names.insert(provider.display_name()) {
                return Err(LlmError::ConfigurationError(format!(
                    "Provider name '{}' is used more than once",
                    provider.display_name()
                )));
            }
        }
        Ok(())
    }

    pub fn provider(&self, provider_type: ProviderType) -> Option<&ProviderConfig> {
        self.providers
            .iter()
            .find(|p| p.provider_type == provider_type)
    }

    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_max_providers_to_try(mut self, max: usize) -> Self {
        self.routing.max_providers_to_try = max;
        self
    }

    pub fn with_circuit_breaker(mut self, failure_threshold: u32, cool_down: Duration) -> Self {
        self.circuit_breaker = CircuitBreakerConfig {
            failure_threshold,
            cool_down,
        };
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_health_check_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout = timeout;
        self
    }
}

/// One backend provider.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,

    /// Display name, defaults to the provider type name
    #[serde(default)]
    #[validate(length(min = 1, message = "Provider name cannot be empty"))]
    pub name: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_priority")]
    pub priority: u32,

    #[serde(default = "default_true")]
    pub supports_chat: bool,

    #[serde(default = "default_true")]
    pub supports_streaming: bool,

    #[serde(default = "default_true")]
    pub supports_embeddings: bool,

    /// Allowed model ids or id prefixes; empty allows any model
    #[serde(default)]
    pub models: Vec<String>,

    #[serde(default)]
    #[validate(custom(function = "http_url"))]
    pub base_url: Option<String>,

    #[serde(default, deserialize_with = "optional_secret")]
    pub api_key: Option<SecretString>,

    /// Per-provider request timeout handed to the client builder
    #[serde(default, deserialize_with = "optional_duration_secs")]
    pub timeout: Option<Duration>,
}

impl ProviderConfig {
    pub fn new(provider_type: ProviderType) -> Self {
        Self {
            provider_type,
            name: None,
            enabled: true,
            priority: DEFAULT_PRIORITY,
            supports_chat: true,
            supports_streaming: true,
            supports_embeddings: true,
            models: Vec::new(),
            base_url: None,
            api_key: None,
            timeout: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_embeddings(mut self) -> Self {
        self.supports_embeddings = false;
        self
    }

    pub fn without_streaming(mut self) -> Self {
        self.supports_streaming = false;
        self
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.provider_type.to_string())
    }

    pub fn supports(&self, operation: OperationKind) -> bool {
        match operation {
            OperationKind::Chat => self.supports_chat,
            OperationKind::Streaming => self.supports_streaming,
            OperationKind::Embedding => self.supports_embeddings,
        }
    }

    /// Whether `model` passes the allowlist (exact id or prefix).
    pub fn serves_model(&self, model: &str) -> bool {
        self.models.is_empty() || self.models.iter().any(|m| model.starts_with(m.as_str()))
    }
}

/// Candidate routing limits.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct RoutingConfig {
    #[validate(range(min = 1, message = "max_providers_to_try must be at least 1"))]
    pub max_providers_to_try: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_providers_to_try: 3,
        }
    }
}

/// Circuit breaker thresholds, shared by every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Validate)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    #[validate(range(min = 1, message = "failure_threshold must be at least 1"))]
    pub failure_threshold: u32,

    #[serde(deserialize_with = "duration_secs")]
    #[validate(custom(function = "non_zero_duration"))]
    pub cool_down: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cool_down: Duration::from_secs(30),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_priority() -> u32 {
    DEFAULT_PRIORITY
}

fn duration_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}

fn optional_duration_secs<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
}

fn optional_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

fn non_zero_duration(value: &Duration) -> Result<(), ValidationError> {
    if value.is_zero() {
        return Err(ValidationError::new("zero_duration"));
    }
    Ok(())
}

fn http_url(value: &str) -> Result<(), ValidationError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ValidationError::new("base_url")
            .with_message("Base URL must start with http:// or https://".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;

    #[test]
    fn defaults_apply_to_sparse_json() {
        let config = GatewayConfig::from_json_str(
            r#"{ "providers": [ { "provider_type": "openai" } ] }"#,
        )
        .unwrap();

        assert_eq!(config.routing.max_providers_to_try, 3);
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.circuit_breaker.cool_down, Duration::from_secs(30));
        assert_eq!(config.default_timeout, Duration::from_secs(120));
        assert_eq!(config.health_check_timeout, Duration::from_secs(10));

        let openai = &config.providers[0];
        assert!(openai.enabled);
        assert_eq!(openai.priority, DEFAULT_PRIORITY);
        assert!(openai.supports(OperationKind::Embedding));
        assert_eq!(openai.display_name(), "openai");
    }

    #[test]
    fn parses_durations_and_secrets() {
        let config = GatewayConfig::from_json_str(
            r#"{
                "providers": [
                    { "provider_type": "anthropic", "priority": 5, "api_key": "sk-ant-123",
                      "timeout": 45, "supports_embeddings": false }
                ],
                "circuit_breaker": { "failure_threshold": 2, "cool_down": 60 },
                "default_timeout": 30
            }"#,
        )
        .unwrap();

        let anthropic = config.provider(ProviderType::Anthropic).unwrap();
        assert_eq!(anthropic.priority, 5);
        assert_eq!(anthropic.timeout, Some(Duration::from_secs(45)));
        assert_eq!(
            anthropic.api_key.as_ref().map(|k| k.expose_secret()),
            Some("sk-ant-123")
        );
        assert!(!anthropic.supports(OperationKind::Embedding));
        assert!(!format!("{anthropic:?}").contains("sk-ant-123"));
        assert_eq!(config.circuit_breaker.cool_down, Duration::from_secs(60));
        assert_eq!(config.default_timeout, Duration::from_secs(30));
    }

    #[test]
    fn rejects_duplicate_provider_types() {
        let err = GatewayConfig::from_json_str(
            r#"{ "providers": [ { "provider_type": "openai" }, { "provider_type": "openai", "name": "second" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, LlmError::ConfigurationError(_)));
    }

    #[test]
    fn rejects_invalid_fields() {
        assert!(
            GatewayConfig::from_json_str(r#"{ "routing": { "max_providers_to_try": 0 } }"#)
                .is_err()
        );
        assert!(
            GatewayConfig::from_json_str(r#"{ "circuit_breaker": { "cool_down": 0 } }"#).is_err()
        );
        assert!(
            GatewayConfig::from_json_str(
                r#"{ "providers": [ { "provider_type": "ollama", "base_url": "localhost:11434" } ] }"#
            )
            .is_err()
        );
        assert!(GatewayConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn model_allowlist_matches_exact_and_prefix() {
        let provider = ProviderConfig::new(ProviderType::OpenAi).with_models(["gpt-4o", "o3"]);
        assert!(provider.serves_model("gpt-4o"));
        assert!(provider.serves_model("gpt-4o-mini"));
        assert!(provider.serves_model("o3-pro"));
        assert!(!provider.serves_model("claude-3-opus"));
        assert!(ProviderConfig::new(ProviderType::Ollama).serves_model("anything"));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "providers": [ {{ "provider_type": "gemini", "priority": 1 }} ] }}"#
        )
        .unwrap();

        let config = GatewayConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.providers[0].provider_type, ProviderType::Gemini);
        assert!(GatewayConfig::from_json_file("/nonexistent/gateway.json").is_err());
    }
}
