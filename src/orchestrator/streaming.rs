//! Streaming with atomic attempts
//!
//! Each candidate's stream is drained into a buffer under the call scope.
//! Only a cleanly finished buffer is replayed to the caller, so the caller
//! never sees chunks from a provider that later faulted or chunks from two
//! providers. The price is that the first chunk arrives only once a whole
//! attempt has completed.

use std::pin::Pin;

use chrono::Utc;
use futures::Stream;
use tokio::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

use super::outcome::{ExecutionMetrics, Outcome, ReportsUsage};
use super::{ExecutionContext, ProviderOrchestrator, apply_force_model, invalid_request};
use crate::error::{LlmError, OrchestratorErrorCode};
use crate::failover::FailoverAttempt;
use crate::streaming::collect_chunks;
use crate::types::{ChatRequest, ChatResponse, OperationKind};
use crate::utils::cancel::CancelHandle;

/// Finite stream of outcomes: either every chunk of one successful attempt,
/// or exactly one failure item.
pub type OutcomeStream<T> = Pin<Box<dyn Stream<Item = Outcome<T>> + Send>>;

impl ProviderOrchestrator {
    /// Streaming chat completion with per-attempt buffering.
    pub fn execute_streaming(
        &self,
        request: &ChatRequest,
        context: Option<&ExecutionContext>,
        cancel: &CancelHandle,
    ) -> OutcomeStream<ChatResponse> {
        let this = self.clone();
        let context = context.cloned().unwrap_or_default();
        let mut request = apply_force_model(request, &context).into_owned();
        request.stream = true;
        let cancel = cancel.clone();
        let correlation_id = context.resolve_correlation_id(request.correlation_id.as_deref());
        let span = info_span!(
            "streaming",
            correlation_id = %correlation_id,
            model = %request.model
        );

        let stream = async_stream::stream! {
            let started = Instant::now();
            if let Err(e) = request.validate_request() {
                yield invalid_request(e, correlation_id, started);
                return;
            }

            let plan = this.plan(
                OperationKind::Streaming,
                &request.model,
                request.timeout,
                &context,
                &cancel,
                correlation_id,
            );
            let selection = match this.select(&plan) {
                Ok(selection) => selection,
                Err(e) => {
                    yield super::selection_failure(e, plan.correlation_id, started);
                    return;
                }
            };

            let clients = match this
                .instantiate(&selection.candidates, &plan.scope)
                .instrument(span.clone())
                .await
            {
                Ok(clients) => clients,
                Err(failure) => {
                    yield failure
                        .into_outcome(plan.correlation_id)
                        .with_metrics(super::elapsed_metrics(started, 0));
                    return;
                }
            };

            let mut attempts: Vec<FailoverAttempt> = Vec::new();
            let mut last_error: Option<String> = None;

            for (provider, client) in selection.candidates.iter().copied().zip(clients) {
                if let Some(kind) = plan.scope.interrupted() {
                    info!(parent: &span, provider = %provider, reason = %kind, "Streaming halted before next attempt");
                    yield failed_outcome(kind.code(), kind.message(), plan.correlation_id, attempts, started);
                    return;
                }

                if !selection.forced && this.tracker.is_blacklisted(provider) {
                    debug!(parent: &span, provider = %provider, "Skipping blacklisted provider");
                    continue;
                }

                debug!(parent: &span, provider = %provider, attempt = attempts.len() + 1, "Draining provider stream");
                let attempt_started = Instant::now();
                let timestamp = Utc::now();
                let handle = plan.scope.handle();
                let drained = plan
                    .scope
                    .run(async {
                        let stream = client.chat_stream(&request, &handle).await?;
                        let chunks = collect_chunks(stream).await?;
                        if chunks.is_empty() {
                            return Err(LlmError::StreamError(
                                "provider stream ended without output".to_string(),
                            ));
                        }
                        Ok(chunks)
                    })
                    .instrument(span.clone())
                    .await;

                match drained {
                    Err(kind) => {
                        info!(parent: &span, provider = %provider, reason = %kind, "Provider stream interrupted");
                        yield failed_outcome(kind.code(), kind.message(), plan.correlation_id, attempts, started);
                        return;
                    }
                    Ok(Err(error)) => {
                        warn!(
                            parent: &span,
                            provider = %provider,
                            error = %error,
                            "Provider stream failed, discarding buffered output"
                        );
                        this.tracker.record_failure(provider, &error.to_string());
                        last_error = Some(format!("{provider}: {error}"));
                        attempts.push(FailoverAttempt::failed(provider, error, attempt_started, timestamp));
                    }
                    Ok(Ok(chunks)) => {
                        this.tracker.record_success(provider);
                        attempts.push(FailoverAttempt::succeeded(provider, attempt_started, timestamp));

                        let (input_tokens, output_tokens) = chunks
                            .iter()
                            .rev()
                            .find(|c| c.usage.is_some())
                            .map(|c| c.token_usage())
                            .unwrap_or((None, None));
                        let first_output = started.elapsed();
                        let metrics = ExecutionMetrics {
                            total_duration: first_output,
                            providers_attempted: attempts.len(),
                            input_tokens,
                            output_tokens,
                            time_to_first_output: Some(first_output),
                        };
                        info!(
                            parent: &span,
                            provider = %provider,
                            chunks = chunks.len(),
                            attempts = attempts.len(),
                            "Replaying buffered stream"
                        );

                        for chunk in chunks {
                            let model = chunk.model.clone();
                            yield Outcome::success(chunk, provider, model, plan.correlation_id.clone())
                                .with_attempts(attempts.clone())
                                .with_metrics(metrics.clone());
                        }
                        return;
                    }
                }
            }

            let (code, message) = match last_error {
                Some(last) => (
                    OrchestratorErrorCode::AllProvidersFailed,
                    format!("All providers failed; last error: {last}"),
                ),
                None => (
                    OrchestratorErrorCode::NoProviderAvailable,
                    "no provider could be contacted".to_string(),
                ),
            };
            warn!(parent: &span, code = %code, attempts = attempts.len(), "Streaming request failed");
            yield failed_outcome(code, &message, plan.correlation_id, attempts, started);
        };

        Box::pin(stream)
    }
}

fn failed_outcome(
    code: OrchestratorErrorCode,
    message: &str,
    correlation_id: String,
    attempts: Vec<FailoverAttempt>,
    started: Instant,
) -> Outcome<ChatResponse> {
    let attempted = attempts.len();
    Outcome::failure(code, message, correlation_id)
        .with_attempts(attempts)
        .with_metrics(ExecutionMetrics {
            total_duration: started.elapsed(),
            providers_attempted: attempted,
            ..Default::default()
        })
}
