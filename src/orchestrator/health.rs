//! Aggregate provider health.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, info_span, warn};

use super::ProviderOrchestrator;
use crate::types::ProviderType;
use crate::utils::cancel::{CallScope, CancelHandle, Interrupt};

/// Health of one configured provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderHealthStatus {
    /// Probe succeeded and the circuit is closed
    pub is_healthy: bool,
    pub is_blacklisted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blacklisted_until: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub last_checked: DateTime<Utc>,
}

impl ProviderOrchestrator {
    /// Probe every provider the client factory knows, one at a time.
    ///
    /// Each probe is bounded by `health_check_timeout` and by `cancel`; a
    /// failing probe only affects its own provider's entry.
    pub async fn providers_health(
        &self,
        cancel: &CancelHandle,
    ) -> BTreeMap<ProviderType, ProviderHealthStatus> {
        let blacklisted = self.tracker.blacklisted_providers();
        let probe_timeout = self.config.health_check_timeout;
        let mut report = BTreeMap::new();

        for provider in self.factory.supported_types() {
            let scope = CallScope::new(cancel, Some(probe_timeout));
            let handle = scope.handle();
            let probe = scope
                .run(async {
                    let client = self.factory.create_client(provider).await?;
                    client.health_check(&handle).await
                })
                .instrument(info_span!("health_probe", provider = %provider))
                .await;

            let (probe_ok, probe_error) = match probe {
                Ok(Ok(true)) => (true, None),
                Ok(Ok(false)) => (false, Some("health check reported unhealthy".to_string())),
                Ok(Err(error)) => (false, Some(error.to_string())),
                Err(Interrupt::TimedOut) => (
                    false,
                    Some(format!(
                        "health check timed out after {}s",
                        probe_timeout.as_secs()
                    )),
                ),
                Err(Interrupt::Cancelled) => (false, Some("health check cancelled".to_string())),
            };

            let info = blacklisted.get(&provider);
            let status = ProviderHealthStatus {
                is_healthy: probe_ok && info.is_none(),
                is_blacklisted: info.is_some(),
                blacklisted_until: info.map(|i| i.expires_at),
                consecutive_failures: self.tracker.failure_count(provider),
                last_error: probe_error.or_else(|| info.and_then(|i| i.reason.clone())),
                last_checked: Utc::now(),
            };

            if status.is_healthy {
                debug!(provider = %provider, "Provider healthy");
            } else {
                warn!(
                    provider = %provider,
                    blacklisted = status.is_blacklisted,
                    error = status.last_error.as_deref().unwrap_or_default(),
                    "Provider unhealthy"
                );
            }
            report.insert(provider, status);
        }

        report
    }
}
