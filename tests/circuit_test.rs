mod support;

use std::sync::Arc;

use llm_relay::prelude::*;
use support::{Behavior, MockFactory, MockProvider, chat_request, orchestrator, ranked_config, secs};

const A: ProviderType = ProviderType::OpenAi;
const B: ProviderType = ProviderType::Anthropic;

fn two_provider_setup(threshold: u32) -> (ProviderOrchestrator, Arc<MockProvider>, Arc<MockProvider>) {
    let a = MockProvider::failing(A, "upstream 503");
    let b = MockProvider::succeeding(B);
    let config = ranked_config(&[A, B]).with_circuit_breaker(threshold, secs(30));
    let orchestrator = orchestrator(config, MockFactory::new(&[a.clone(), b.clone()]));
    (orchestrator, a, b)
}

async fn complete(orchestrator: &ProviderOrchestrator) -> Outcome<ChatResponse> {
    orchestrator
        .execute_completion(&chat_request(), None, &CancelHandle::new())
        .await
}

#[tokio::test(start_paused = true)]
async fn repeated_failures_trip_the_circuit() {
    let (orchestrator, a, _b) = two_provider_setup(2);

    complete(&orchestrator).await;
    assert!(!orchestrator.tracker().is_blacklisted(A));
    assert_eq!(orchestrator.tracker().failure_count(A), 1);

    complete(&orchestrator).await;
    assert!(orchestrator.tracker().is_blacklisted(A));
    assert_eq!(orchestrator.tracker().state(A), CircuitState::Open);

    // Tripped provider is no longer a candidate
    let outcome = complete(&orchestrator).await;
    assert!(outcome.success);
    assert_eq!(outcome.provider, Some(B));
    assert_eq!(outcome.attempts.len(), 1);
    assert_eq!(a.calls(), 2);

    let snapshot = orchestrator.tracker().blacklisted_providers();
    let info = snapshot.get(&A).unwrap();
    assert_eq!(info.reason.as_deref(), Some("openai error: upstream 503"));
    assert!(info.expires_at > info.blacklisted_at);
}

#[tokio::test(start_paused = true)]
async fn circuit_recovers_after_cool_down() {
    let (orchestrator, a, _b) = two_provider_setup(1);

    complete(&orchestrator).await;
    assert!(orchestrator.tracker().is_blacklisted(A));

    tokio::time::advance(secs(29)).await;
    assert!(orchestrator.tracker().is_blacklisted(A));

    tokio::time::advance(secs(2)).await;
    assert!(!orchestrator.tracker().is_blacklisted(A));
    assert!(orchestrator.tracker().blacklisted_providers().is_empty());

    a.set_behavior(Behavior::Succeed);
    let outcome = complete(&orchestrator).await;
    assert_eq!(outcome.provider, Some(A));
}

#[tokio::test(start_paused = true)]
async fn success_resets_the_failure_counter() {
    let (orchestrator, a, _b) = two_provider_setup(3);

    complete(&orchestrator).await;
    complete(&orchestrator).await;
    assert_eq!(orchestrator.tracker().failure_count(A), 2);

    a.set_behavior(Behavior::Succeed);
    let outcome = complete(&orchestrator).await;
    assert_eq!(outcome.provider, Some(A));
    assert_eq!(orchestrator.tracker().failure_count(A), 0);

    // Counting starts over after the reset
    a.set_behavior(Behavior::Fail("again".to_string()));
    complete(&orchestrator).await;
    complete(&orchestrator).await;
    assert!(!orchestrator.tracker().is_blacklisted(A));
}

#[tokio::test]
async fn success_clears_a_manual_blacklist() {
    let (orchestrator, a, _b) = two_provider_setup(5);
    orchestrator
        .tracker()
        .blacklist(A, secs(300), "maintenance window");
    a.set_behavior(Behavior::Succeed);

    let forced = ExecutionContext::new().with_force_provider(A);
    orchestrator
        .execute_completion(&chat_request(), Some(&forced), &CancelHandle::new())
        .await;

    assert!(!orchestrator.tracker().is_blacklisted(A));
}

#[tokio::test]
async fn forced_provider_bypasses_an_open_circuit() {
    let (orchestrator, a, b) = two_provider_setup(5);
    orchestrator.tracker().blacklist(A, secs(60), "manual");
    a.set_behavior(Behavior::Succeed);
    let context = ExecutionContext::new().with_force_provider(A);

    let outcome = orchestrator
        .execute_completion(&chat_request(), Some(&context), &CancelHandle::new())
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.provider, Some(A));
    assert_eq!(outcome.attempts.len(), 1);
    assert_eq!(b.calls(), 0);
}

#[tokio::test]
async fn forced_provider_failure_does_not_fall_back() {
    let (orchestrator, _a, b) = two_provider_setup(5);
    let context = ExecutionContext::new().with_force_provider(A);

    let outcome = orchestrator
        .execute_completion(&chat_request(), Some(&context), &CancelHandle::new())
        .await;

    assert_eq!(
        outcome.error_code,
        Some(OrchestratorErrorCode::AllProvidersFailed)
    );
    assert_eq!(b.calls(), 0);
}

#[tokio::test]
async fn forcing_an_unconfigured_provider_is_no_provider_available() {
    let (orchestrator, _a, _b) = two_provider_setup(5);
    let context = ExecutionContext::new().with_force_provider(ProviderType::Cohere);

    let outcome = orchestrator
        .execute_completion(&chat_request(), Some(&context), &CancelHandle::new())
        .await;

    assert_eq!(
        outcome.error_code,
        Some(OrchestratorErrorCode::NoProviderAvailable)
    );
}

#[tokio::test]
async fn every_candidate_blacklisted_is_no_provider_available() {
    let (orchestrator, a, b) = two_provider_setup(5);
    orchestrator.tracker().blacklist(A, secs(60), "manual");
    orchestrator.tracker().blacklist(B, secs(60), "manual");

    let outcome = complete(&orchestrator).await;

    assert_eq!(
        outcome.error_code,
        Some(OrchestratorErrorCode::NoProviderAvailable)
    );
    assert!(outcome.attempts.is_empty());
    assert_eq!(a.calls() + b.calls(), 0);
}

#[tokio::test]
async fn injected_tracker_is_shared_across_orchestrators() {
    let tracker = Arc::new(InMemoryCircuitTracker::new(CircuitBreakerConfig {
        failure_threshold: 1,
        cool_down: secs(30),
    }));
    let a = MockProvider::failing(A, "down");
    let b = MockProvider::succeeding(B);
    let factory = MockFactory::new(&[a.clone(), b.clone()]);

    let first = ProviderOrchestrator::with_tracker(
        ranked_config(&[A, B]),
        factory.clone(),
        tracker.clone(),
    );
    let second = ProviderOrchestrator::with_tracker(ranked_config(&[A, B]), factory, tracker);

    complete(&first).await;
    let outcome = complete(&second).await;

    assert_eq!(outcome.provider, Some(B));
    assert_eq!(a.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failures_are_counted_exactly() {
    let tracker = Arc::new(InMemoryCircuitTracker::new(CircuitBreakerConfig {
        failure_threshold: 8000,
        cool_down: secs(300),
    }));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let tracker = tracker.clone();
            tokio::spawn(async move {
                for _ in 0..1000 {
                    tracker.record_failure(A, "upstream 503");
                    let _ = tracker.is_blacklisted(A);
                    let _ = tracker.is_blacklisted(B);
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(tracker.failure_count(A), 8000);
    assert!(tracker.is_blacklisted(A));
    assert_eq!(tracker.failure_count(B), 0);
    assert!(!tracker.is_blacklisted(B));
}
