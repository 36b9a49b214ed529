//! Provider orchestration
//!
//! `ProviderOrchestrator` is the entry point of the gateway core. For each
//! call it resolves candidates through the selector, builds one client per
//! candidate, and runs the call with sequential failover. Every public method
//! returns a classified `Outcome`; provider faults never escape as errors.
//!
//! - completion and embedding go through the `FailoverCoordinator`
//! - streaming drains each attempt into a buffer before replaying it
//!   (see `streaming`)
//! - `providers_health` combines circuit state with live probes

pub mod context;
pub mod health;
pub mod outcome;
mod streaming;

pub use context::ExecutionContext;
pub use health::ProviderHealthStatus;
pub use outcome::{ExecutionMetrics, Outcome, ReportsUsage};
pub use streaming::OutcomeStream;

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::circuit::{CircuitTracker, InMemoryCircuitTracker};
use crate::config::GatewayConfig;
use crate::error::{LlmError, OrchestratorErrorCode};
use crate::factory::ClientFactory;
use crate::failover::{FailoverAttempt, FailoverCoordinator, FailoverOutcome, Interrupted};
use crate::selection::{ProviderSelector, Selection, SelectionCriteria, SelectionError};
use crate::traits::ProviderClient;
use crate::types::{
    ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, OperationKind, ProviderType,
};
use crate::utils::cancel::{CallScope, CancelHandle, Interrupt};

/// Top-level façade over selection, client construction and failover.
///
/// Cheap to clone; clones share the circuit tracker and client factory.
#[derive(Clone)]
pub struct ProviderOrchestrator {
    config: Arc<GatewayConfig>,
    factory: Arc<dyn ClientFactory>,
    tracker: Arc<dyn CircuitTracker>,
    selector: Arc<ProviderSelector>,
    coordinator: FailoverCoordinator,
}

/// Everything resolved for one call before any provider is contacted.
struct CallPlan {
    correlation_id: String,
    scope: CallScope,
    criteria: SelectionCriteria,
    cap: usize,
}

impl ProviderOrchestrator {
    /// Build with an in-memory circuit tracker using the configured thresholds.
    pub fn new(config: GatewayConfig, factory: Arc<dyn ClientFactory>) -> Self {
        let tracker = Arc::new(InMemoryCircuitTracker::new(config.circuit_breaker));
        Self::with_tracker(config, factory, tracker)
    }

    pub fn with_tracker(
        config: GatewayConfig,
        factory: Arc<dyn ClientFactory>,
        tracker: Arc<dyn CircuitTracker>,
    ) -> Self {
        let selector = Arc::new(ProviderSelector::new(
            config.providers.clone(),
            tracker.clone(),
        ));
        Self {
            config: Arc::new(config),
            factory,
            coordinator: FailoverCoordinator::new(tracker.clone()),
            tracker,
            selector,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn tracker(&self) -> &Arc<dyn CircuitTracker> {
        &self.tracker
    }

    /// Single-shot chat completion with failover.
    pub async fn execute_completion(
        &self,
        request: &ChatRequest,
        context: Option<&ExecutionContext>,
        cancel: &CancelHandle,
    ) -> Outcome<ChatResponse> {
        let context = context.cloned().unwrap_or_default();
        let request = apply_force_model(request, &context);
        let correlation_id = context.resolve_correlation_id(request.correlation_id.as_deref());
        let span = info_span!(
            "completion",
            correlation_id = %correlation_id,
            model = %request.model
        );

        async {
            let started = Instant::now();
            if let Err(e) = request.validate_request() {
                return invalid_request(e, correlation_id, started);
            }

            let plan = self.plan(
                OperationKind::Chat,
                &request.model,
                request.timeout,
                &context,
                cancel,
                correlation_id,
            );

            let request: &ChatRequest = &request;
            self.run_with_failover(plan, started, move |client, handle| async move {
                client.chat(request, &handle).await
            })
            .await
        }
        .instrument(span)
        .await
    }

    /// Embedding generation with failover.
    pub async fn execute_embedding(
        &self,
        request: &EmbeddingRequest,
        context: Option<&ExecutionContext>,
        cancel: &CancelHandle,
    ) -> Outcome<EmbeddingResponse> {
        let context = context.cloned().unwrap_or_default();
        let request = apply_force_model(request, &context);
        let correlation_id = context.resolve_correlation_id(request.correlation_id.as_deref());
        let span = info_span!(
            "embedding",
            correlation_id = %correlation_id,
            model = %request.model
        );

        async {
            let started = Instant::now();
            if let Err(e) = request.validate_request() {
                return invalid_request(e, correlation_id, started);
            }

            let plan = self.plan(
                OperationKind::Embedding,
                &request.model,
                request.timeout,
                &context,
                cancel,
                correlation_id,
            );

            let request: &EmbeddingRequest = &request;
            self.run_with_failover(plan, started, move |client, handle| async move {
                client.embed(request, &handle).await
            })
            .await
        }
        .instrument(span)
        .await
    }

    fn plan(
        &self,
        operation: OperationKind,
        model: &str,
        request_timeout: Option<Duration>,
        context: &ExecutionContext,
        cancel: &CancelHandle,
        correlation_id: String,
    ) -> CallPlan {
        let timeout = context.effective_timeout(request_timeout, self.config.default_timeout);
        let criteria = SelectionCriteria::new(operation)
            .with_model(model)
            .with_forced(context.force_provider)
            .with_preferred(context.preferred_providers.clone())
            .with_excluded(context.excluded_providers.clone());

        CallPlan {
            correlation_id,
            scope: CallScope::new(cancel, Some(timeout)),
            criteria,
            cap: context.attempt_cap(self.config.routing.max_providers_to_try),
        }
    }

    /// Candidates for `plan`, capped before any client is built.
    fn select(&self, plan: &CallPlan) -> Result<Selection, SelectionError> {
        let mut selection = self.selector.select(&plan.criteria).inspect_err(|e| {
            warn!(error = %e, "Provider selection failed");
        })?;
        selection.candidates.truncate(plan.cap);
        Ok(selection)
    }

    /// Build one client per candidate, in order.
    async fn instantiate(
        &self,
        candidates: &[ProviderType],
        scope: &CallScope,
    ) -> Result<Vec<Arc<dyn ProviderClient>>, ConstructionFailure> {
        let mut clients = Vec::with_capacity(candidates.len());
        for provider in candidates {
            match scope.run(self.factory.create_client(*provider)).await {
                Ok(Ok(client)) => clients.push(client),
                Ok(Err(error)) => {
                    warn!(provider = %provider, error = %error, "Failed to build provider client");
                    return Err(ConstructionFailure::Fault(*provider, error));
                }
                Err(kind) => return Err(ConstructionFailure::Interrupted(kind)),
            }
        }
        Ok(clients)
    }

    async fn run_with_failover<T, F, Fut>(
        &self,
        plan: CallPlan,
        started: Instant,
        operation: F,
    ) -> Outcome<T>
    where
        T: ReportsUsage + HasModel,
        F: Fn(Arc<dyn ProviderClient>, CancelHandle) -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let selection = match self.select(&plan) {
            Ok(selection) => selection,
            Err(e) => return selection_failure(e, plan.correlation_id, started),
        };
        debug!(candidates = ?selection.candidates, forced = selection.forced, "Resolved candidates");

        let clients = match self.instantiate(&selection.candidates, &plan.scope).await {
            Ok(clients) => clients,
            Err(failure) => {
                return failure
                    .into_outcome(plan.correlation_id)
                    .with_metrics(elapsed_metrics(started, 0));
            }
        };

        let result = self
            .coordinator
            .execute_with_failover(&clients, &plan.scope, selection.forced, operation)
            .await;
        drop(clients);

        match result {
            Ok(outcome) => finish(outcome, plan.correlation_id, started),
            Err(interrupted) => interrupted_outcome(interrupted, plan.correlation_id, started),
        }
    }
}

/// Model id reported by a provider payload.
pub trait HasModel {
    fn model_id(&self) -> &str;
}

impl HasModel for ChatResponse {
    fn model_id(&self) -> &str {
        &self.model
    }
}

impl HasModel for EmbeddingResponse {
    fn model_id(&self) -> &str {
        &self.model
    }
}

enum ConstructionFailure {
    Fault(ProviderType, LlmError),
    Interrupted(Interrupt),
}

impl ConstructionFailure {
    fn into_outcome<T>(self, correlation_id: String) -> Outcome<T> {
        match self {
            Self::Fault(provider, error @ LlmError::UnsupportedProvider(_)) => Outcome::failure(
                OrchestratorErrorCode::NoProviderAvailable,
                format!("{provider}: {error}"),
                correlation_id,
            ),
            Self::Fault(provider, error) => Outcome::failure(
                OrchestratorErrorCode::AllProvidersFailed,
                format!("All providers failed: {provider}: {error}"),
                correlation_id,
            ),
            Self::Interrupted(kind) => Outcome::failure(kind.code(), kind.message(), correlation_id),
        }
    }
}

/// Request payloads whose model an `ExecutionContext` may override.
trait ModelOverride: Clone {
    fn set_model(&mut self, model: String);
}

impl ModelOverride for ChatRequest {
    fn set_model(&mut self, model: String) {
        self.model = model;
    }
}

impl ModelOverride for EmbeddingRequest {
    fn set_model(&mut self, model: String) {
        self.model = model;
    }
}

fn apply_force_model<'a, R: ModelOverride>(request: &'a R, context: &ExecutionContext) -> Cow<'a, R> {
    match &context.force_model {
        Some(model) => {
            let mut overridden = request.clone();
            overridden.set_model(model.clone());
            Cow::Owned(overridden)
        }
        None => Cow::Borrowed(request),
    }
}

fn invalid_request<T>(error: LlmError, correlation_id: String, started: Instant) -> Outcome<T> {
    warn!(error = %error, "Rejected invalid request");
    Outcome::failure(
        OrchestratorErrorCode::InvalidRequest,
        error.to_string(),
        correlation_id,
    )
    .with_metrics(elapsed_metrics(started, 0))
}

fn selection_failure<T>(error: SelectionError, correlation_id: String, started: Instant) -> Outcome<T> {
    Outcome::failure(error.code(), error.to_string(), correlation_id)
        .with_metrics(elapsed_metrics(started, 0))
}

fn elapsed_metrics(started: Instant, providers_attempted: usize) -> ExecutionMetrics {
    ExecutionMetrics {
        total_duration: started.elapsed(),
        providers_attempted,
        ..Default::default()
    }
}

fn finish<T: ReportsUsage + HasModel>(
    outcome: FailoverOutcome<T>,
    correlation_id: String,
    started: Instant,
) -> Outcome<T> {
    let elapsed = started.elapsed();
    let all_skipped = outcome.all_skipped();
    match (outcome.result, outcome.provider) {
        (Some(data), Some(provider)) => {
            let (input_tokens, output_tokens) = data.token_usage();
            let model = data.model_id().to_string();
            info!(
                provider = %provider,
                attempts = outcome.attempts.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Request completed"
            );
            let attempted = outcome.attempts.len();
            Outcome::success(data, provider, model, correlation_id)
                .with_attempts(outcome.attempts)
                .with_metrics(ExecutionMetrics {
                    total_duration: elapsed,
                    providers_attempted: attempted,
                    input_tokens,
                    output_tokens,
                    time_to_first_output: Some(elapsed),
                })
        }
        _ => {
            let attempted = outcome.attempts.len();
            let (code, message) = if all_skipped {
                (
                    OrchestratorErrorCode::NoProviderAvailable,
                    "all candidate providers are blacklisted".to_string(),
                )
            } else if outcome.attempts.is_empty() {
                (
                    OrchestratorErrorCode::NoProviderAvailable,
                    "no provider could be contacted".to_string(),
                )
            } else {
                (
                    OrchestratorErrorCode::AllProvidersFailed,
                    format!("All providers failed: {}", summarize(&outcome.attempts)),
                )
            };
            warn!(code = %code, attempts = attempted, "Request failed");
            Outcome::failure(code, message, correlation_id)
                .with_attempts(outcome.attempts)
                .with_metrics(elapsed_metrics(started, attempted))
        }
    }
}

fn interrupted_outcome<T>(
    interrupted: Interrupted,
    correlation_id: String,
    started: Instant,
) -> Outcome<T> {
    let Interrupted {
        kind,
        attempts,
        in_flight,
    } = interrupted;
    info!(reason = %kind, in_flight = ?in_flight, attempts = attempts.len(), "Request interrupted");
    let attempted = attempts.len();
    Outcome::failure(kind.code(), kind.message(), correlation_id)
        .with_attempts(attempts)
        .with_metrics(elapsed_metrics(started, attempted))
}

fn summarize(attempts: &[FailoverAttempt]) -> String {
    crate::failover::summarize_failures(attempts)
}
