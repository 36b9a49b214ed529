//! Per-call execution overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::ProviderType;

/// Optional overrides for one call. The default overrides nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionContext {
    /// Use only this provider, whatever its circuit state
    pub force_provider: Option<ProviderType>,
    /// Replace the request's model id
    pub force_model: Option<String>,
    /// Try at most one provider
    pub disable_failover: bool,
    /// Deadline for the whole call; wins over the request timeout
    pub timeout: Option<Duration>,
    pub max_providers_to_try: Option<usize>,
    pub correlation_id: Option<String>,
    pub preferred_providers: Vec<ProviderType>,
    pub excluded_providers: Vec<ProviderType>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_force_provider(mut self, provider: ProviderType) -> Self {
        self.force_provider = Some(provider);
        self
    }

    pub fn with_force_model(mut self, model: impl Into<String>) -> Self {
        self.force_model = Some(model.into());
        self
    }

    pub fn with_disable_failover(mut self, disable: bool) -> Self {
        self.disable_failover = disable;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_providers_to_try(mut self, max: usize) -> Self {
        self.max_providers_to_try = Some(max);
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_preferred_providers(mut self, providers: Vec<ProviderType>) -> Self {
        self.preferred_providers = providers;
        self
    }

    pub fn with_excluded_providers(mut self, providers: Vec<ProviderType>) -> Self {
        self.excluded_providers = providers;
        self
    }

    /// Number of candidates to keep, never below one.
    pub fn attempt_cap(&self, configured_default: usize) -> usize {
        if self.disable_failover {
            return 1;
        }
        self.max_providers_to_try
            .unwrap_or(configured_default)
            .max(1)
    }

    /// Context timeout, then request timeout, then the configured default.
    pub fn effective_timeout(
        &self,
        request_timeout: Option<Duration>,
        configured_default: Duration,
    ) -> Duration {
        self.timeout
            .or(request_timeout)
            .unwrap_or(configured_default)
    }

    /// Context id, then request id, then a fresh 8-character id.
    pub fn resolve_correlation_id(&self, request_id: Option<&str>) -> String {
        self.correlation_id
            .as_deref()
            .or(request_id)
            .map(str::to_string)
            .unwrap_or_else(new_correlation_id)
    }
}

pub(crate) fn new_correlation_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}
