//! Sequential failover
//!
//! Invokes candidate clients strictly in order until one succeeds, recording
//! every attempt and feeding the circuit tracker. Cancellation and the call
//! deadline abort the loop and are never reported as provider faults.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::circuit::CircuitTracker;
use crate::error::LlmError;
use crate::traits::ProviderClient;
use crate::types::ProviderType;
use crate::utils::cancel::{CallScope, CancelHandle, Interrupt};

/// One invocation of one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailoverAttempt {
    pub provider: ProviderType,
    pub success: bool,
    pub error: Option<LlmError>,
    pub duration: Duration,
    pub timestamp: DateTime<Utc>,
}

impl FailoverAttempt {
    pub fn succeeded(provider: ProviderType, started: Instant, timestamp: DateTime<Utc>) -> Self {
        Self {
            provider,
            success: true,
            error: None,
            duration: started.elapsed(),
            timestamp,
        }
    }

    pub fn failed(
        provider: ProviderType,
        error: LlmError,
        started: Instant,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            provider,
            success: false,
            error: Some(error),
            duration: started.elapsed(),
            timestamp,
        }
    }
}

/// Result of a failover run that was not interrupted.
///
/// On success exactly one attempt succeeded and it is the last one; on
/// failure every attempt failed.
#[derive(Debug, Clone)]
pub struct FailoverOutcome<T> {
    pub success: bool,
    pub result: Option<T>,
    pub provider: Option<ProviderType>,
    pub attempts: Vec<FailoverAttempt>,
    /// Candidates passed over because their circuit was open
    pub skipped: Vec<ProviderType>,
    pub total_duration: Duration,
}

impl<T> FailoverOutcome<T> {
    /// Every supplied candidate was skipped as blacklisted.
    pub fn all_skipped(&self) -> bool {
        self.attempts.is_empty() && !self.skipped.is_empty()
    }

    /// `provider: fault` for every failed attempt, joined with `; `.
    pub fn failure_summary(&self) -> String {
        summarize_failures(&self.attempts)
    }
}

/// The run stopped on cancellation or deadline.
#[derive(Debug, Clone)]
pub struct Interrupted {
    pub kind: Interrupt,
    /// Attempts that completed before the interruption
    pub attempts: Vec<FailoverAttempt>,
    /// Provider whose call was cut short, if the interruption hit mid-call
    pub in_flight: Option<ProviderType>,
}

/// Join failed attempts as `provider: fault; provider: fault`.
pub fn summarize_failures(attempts: &[FailoverAttempt]) -> String {
    attempts
        .iter()
        .filter_map(|a| a.error.as_ref().map(|e| format!("{}: {e}", a.provider)))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Runs operations across ordered candidates.
#[derive(Clone)]
pub struct FailoverCoordinator {
    tracker: Arc<dyn CircuitTracker>,
}

impl FailoverCoordinator {
    pub fn new(tracker: Arc<dyn CircuitTracker>) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &Arc<dyn CircuitTracker> {
        &self.tracker
    }

    /// Try `clients` in order until `operation` succeeds.
    ///
    /// `bypass_circuit` disables the blacklist skip for a forced provider.
    pub async fn execute_with_failover<T, F, Fut>(
        &self,
        clients: &[Arc<dyn ProviderClient>],
        scope: &CallScope,
        bypass_circuit: bool,
        operation: F,
    ) -> Result<FailoverOutcome<T>, Interrupted>
    where
        F: Fn(Arc<dyn ProviderClient>, CancelHandle) -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let started = Instant::now();
        let mut attempts = Vec::with_capacity(clients.len());
        let mut skipped = Vec::new();

        for client in clients {
            let provider = client.provider_type();

            if let Some(kind) = scope.interrupted() {
                info!(provider = %provider, reason = %kind, "Failover halted before next attempt");
                return Err(Interrupted {
                    kind,
                    attempts,
                    in_flight: None,
                });
            }

            if !bypass_circuit && self.tracker.is_blacklisted(provider) {
                debug!(provider = %provider, "Skipping blacklisted provider");
                skipped.push(provider);
                continue;
            }

            debug!(provider = %provider, attempt = attempts.len() + 1, "Invoking provider");
            let attempt_started = Instant::now();
            let timestamp = Utc::now();

            match scope.run(operation(client.clone(), scope.handle())).await {
                Err(kind) => {
                    info!(provider = %provider, reason = %kind, "Provider call interrupted");
                    return Err(Interrupted {
                        kind,
                        attempts,
                        in_flight: Some(provider),
                    });
                }
                Ok(Ok(result)) => {
                    self.tracker.record_success(provider);
                    attempts.push(FailoverAttempt::succeeded(provider, attempt_started, timestamp));
                    info!(
                        provider = %provider,
                        attempts = attempts.len(),
                        "Provider call succeeded"
                    );
                    return Ok(FailoverOutcome {
                        success: true,
                        result: Some(result),
                        provider: Some(provider),
                        attempts,
                        skipped,
                        total_duration: started.elapsed(),
                    });
                }
                Ok(Err(error)) => {
                    warn!(
                        provider = %provider,
                        error = %error,
                        retryable = error.is_retryable(),
                        "Provider call failed, trying next candidate"
                    );
                    self.tracker.record_failure(provider, &error.to_string());
                    attempts.push(FailoverAttempt::failed(
                        provider,
                        error,
                        attempt_started,
                        timestamp,
                    ));
                }
            }
        }

        warn!(
            attempted = attempts.len(),
            skipped = skipped.len(),
            "All provider candidates failed"
        );
        Ok(FailoverOutcome {
            success: false,
            result: None,
            provider: None,
            attempts,
            skipped,
            total_duration: started.elapsed(),
        })
    }
}
