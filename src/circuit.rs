//! Per-provider circuit breaking
//!
//! A provider that fails `failure_threshold` times in a row is blacklisted
//! for `cool_down`. Expiry is evaluated lazily on the next query; there is no
//! background timer and no half-open probe. A success closes the circuit and
//! resets the counter.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::CircuitBreakerConfig;
use crate::types::ProviderType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
}

/// Snapshot of one active blacklisting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistInfo {
    pub blacklisted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub failure_count: u32,
}

/// Fault-isolation state shared by every call.
///
/// Implementations must allow concurrent reads and writes for different
/// providers without a global lock.
pub trait CircuitTracker: Send + Sync {
    /// Whether `provider` is currently excluded. Clears an elapsed blacklisting.
    fn is_blacklisted(&self, provider: ProviderType) -> bool;

    fn record_failure(&self, provider: ProviderType, reason: &str);

    fn record_success(&self, provider: ProviderType);

    /// Exclude `provider` for `duration` regardless of its failure count.
    fn blacklist(&self, provider: ProviderType, duration: Duration, reason: &str);

    fn unblacklist(&self, provider: ProviderType);

    /// Active blacklistings keyed by provider.
    fn blacklisted_providers(&self) -> HashMap<ProviderType, BlacklistInfo>;

    fn state(&self, provider: ProviderType) -> CircuitState {
        if self.is_blacklisted(provider) {
            CircuitState::Open
        } else {
            CircuitState::Closed
        }
    }

    fn failure_count(&self, provider: ProviderType) -> u32;
}

#[derive(Debug, Clone, Default)]
struct ProviderCircuit {
    consecutive_failures: u32,
    last_failure: Option<String>,
    blacklisted_until: Option<Instant>,
    blacklisted_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
}

impl ProviderCircuit {
    fn is_open_at(&self, now: Instant) -> bool {
        self.blacklisted_until.is_some_and(|until| now < until)
    }

    fn has_expired_at(&self, now: Instant) -> bool {
        self.blacklisted_until.is_some_and(|until| now >= until)
    }

    fn open_for(&mut self, duration: Duration) {
        let wall_now = Utc::now();
        let now = Instant::now();
        // Saturate absurd durations at roughly thirty years
        self.blacklisted_until = Some(
            now.checked_add(duration)
                .unwrap_or_else(|| now + Duration::from_secs(30 * 365 * 24 * 3600)),
        );
        self.blacklisted_at = Some(wall_now);
        self.expires_at = Some(
            chrono::Duration::from_std(duration)
                .ok()
                .and_then(|d| wall_now.checked_add_signed(d))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        );
    }

    fn info(&self) -> Option<BlacklistInfo> {
        Some(BlacklistInfo {
            blacklisted_at: self.blacklisted_at?,
            expires_at: self.expires_at?,
            reason: self.last_failure.clone(),
            failure_count: self.consecutive_failures,
        })
    }
}

/// Default `CircuitTracker` on a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryCircuitTracker {
    settings: CircuitBreakerConfig,
    circuits: DashMap<ProviderType, ProviderCircuit>,
}

impl InMemoryCircuitTracker {
    pub fn new(settings: CircuitBreakerConfig) -> Self {
        Self {
            settings,
            circuits: DashMap::new(),
        }
    }

    pub fn settings(&self) -> CircuitBreakerConfig {
        self.settings
    }

    fn clear_if_expired(&self, provider: ProviderType, now: Instant) {
        if self
            .circuits
            .remove_if(&provider, |_, circuit| circuit.has_expired_at(now))
            .is_some()
        {
            info!(provider = %provider, "Provider blacklist expired, circuit closed");
        }
    }
}

impl CircuitTracker for InMemoryCircuitTracker {
    fn is_blacklisted(&self, provider: ProviderType) -> bool {
        let now = Instant::now();
        let expired = match self.circuits.get(&provider) {
            Some(circuit) if circuit.is_open_at(now) => return true,
            Some(circuit) => circuit.has_expired_at(now),
            None => false,
        };
        if expired {
            self.clear_if_expired(provider, now);
        }
        false
    }

    fn record_failure(&self, provider: ProviderType, reason: &str) {
        let threshold = self.settings.failure_threshold;
        let cool_down = self.settings.cool_down;

        let mut circuit = self.circuits.entry(provider).or_default();
        let now = Instant::now();
        if circuit.has_expired_at(now) {
            *circuit = ProviderCircuit::default();
        }
        circuit.consecutive_failures = circuit.consecutive_failures.saturating_add(1);
        circuit.last_failure = Some(reason.to_string());

        if circuit.consecutive_failures >= threshold && !circuit.is_open_at(now) {
            circuit.open_for(cool_down);
            warn!(
                provider = %provider,
                failures = circuit.consecutive_failures,
                cool_down_secs = cool_down.as_secs(),
                reason = %reason,
                "Provider blacklisted after consecutive failures"
            );
        }
    }

    fn record_success(&self, provider: ProviderType) {
        if let Some((_, circuit)) = self.circuits.remove(&provider)
            && circuit.blacklisted_until.is_some()
        {
            info!(provider = %provider, "Provider recovered, circuit closed");
        }
    }

    fn blacklist(&self, provider: ProviderType, duration: Duration, reason: &str) {
        let mut circuit = self.circuits.entry(provider).or_default();
        circuit.last_failure = Some(reason.to_string());
        circuit.open_for(duration);
        warn!(
            provider = %provider,
            duration_secs = duration.as_secs(),
            reason = %reason,
            "Provider manually blacklisted"
        );
    }

    fn unblacklist(&self, provider: ProviderType) {
        if self.circuits.remove(&provider).is_some() {
            info!(provider = %provider, "Provider manually unblacklisted");
        }
    }

    fn blacklisted_providers(&self) -> HashMap<ProviderType, BlacklistInfo> {
        let now = Instant::now();
        let mut expired = Vec::new();
        let mut active = HashMap::new();
        for entry in self.circuits.iter() {
            if entry.is_open_at(now) {
                if let Some(info) = entry.info() {
                    active.insert(*entry.key(), info);
                }
            } else if entry.has_expired_at(now) {
                expired.push(*entry.key());
            }
        }
        for provider in expired {
            self.clear_if_expired(provider, now);
        }
        active
    }

    fn failure_count(&self, provider: ProviderType) -> u32 {
        let now = Instant::now();
        self.circuits
            .get(&provider)
            .filter(|c| !c.has_expired_at(now))
            .map(|c| c.consecutive_failures)
            .unwrap_or(0)
    }
}
