//! Scripted provider clients and a counting client factory for integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use llm_relay::prelude::*;

/// What a mock provider does when called.
#[derive(Debug, Clone)]
pub enum Behavior {
    Succeed,
    /// Fault with this message on every operation
    Fail(String),
    /// Streaming emits this many chunks and then faults; chat faults
    StreamThenFail(usize),
    /// Streaming emits this many chunks and then never yields again; chat faults
    StreamThenHang(usize),
    /// Streaming ends cleanly without a single chunk
    EmptyStream,
    /// Never completes
    Hang,
    /// Cancels the caller's handle, then faults
    CancelCaller(CancelHandle),
}

/// What a mock provider answers to a health probe.
#[derive(Debug, Clone)]
pub enum Health {
    Healthy,
    Unhealthy,
    Error(String),
    Hang,
}

pub struct MockProvider {
    provider: ProviderType,
    behavior: Mutex<Behavior>,
    health: Mutex<Health>,
    calls: AtomicUsize,
    probes: AtomicUsize,
}

impl MockProvider {
    pub fn new(provider: ProviderType, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            provider,
            behavior: Mutex::new(behavior),
            health: Mutex::new(Health::Healthy),
            calls: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
        })
    }

    pub fn succeeding(provider: ProviderType) -> Arc<Self> {
        Self::new(provider, Behavior::Succeed)
    }

    pub fn failing(provider: ProviderType, message: &str) -> Arc<Self> {
        Self::new(provider, Behavior::Fail(message.to_string()))
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn set_health(&self, health: Health) {
        *self.health.lock().unwrap() = health;
    }

    /// Number of chat, streaming and embedding invocations
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    fn next_behavior(&self) -> Behavior {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.behavior.lock().unwrap().clone()
    }

    fn fault(&self, message: &str) -> LlmError {
        LlmError::provider(self.provider.as_str(), message)
    }

    fn chunk(&self, model: &str, index: usize) -> ChatResponse {
        ChatResponse::new(model, format!("{}-{index}", self.provider))
    }
}

#[async_trait]
impl ChatCapability for MockProvider {
    async fn chat(
        &self,
        request: &ChatRequest,
        _cancel: &CancelHandle,
    ) -> Result<ChatResponse, LlmError> {
        match self.next_behavior() {
            Behavior::Succeed | Behavior::EmptyStream => Ok(ChatResponse::new(
                request.model.clone(),
                format!("answer from {}", self.provider),
            )
            .with_usage(Usage::new(12, 7))
            .with_finish_reason(FinishReason::Stop)),
            Behavior::Fail(message) => Err(self.fault(&message)),
            Behavior::StreamThenFail(_) | Behavior::StreamThenHang(_) => {
                Err(self.fault("stream-only provider"))
            }
            Behavior::Hang => std::future::pending().await,
            Behavior::CancelCaller(caller) => {
                caller.cancel();
                Err(self.fault("cancelled upstream"))
            }
        }
    }

    async fn chat_stream(
        &self,
        request: &ChatRequest,
        _cancel: &CancelHandle,
    ) -> Result<ChatStream, LlmError> {
        match self.next_behavior() {
            Behavior::Succeed => {
                let mut chunks: Vec<Result<ChatResponse, LlmError>> =
                    (0..3).map(|i| Ok(self.chunk(&request.model, i))).collect();
                chunks.push(Ok(self
                    .chunk(&request.model, 3)
                    .with_usage(Usage::new(20, 4))
                    .with_finish_reason(FinishReason::Stop)));
                Ok(chat_stream_from_items(chunks))
            }
            Behavior::StreamThenFail(emitted) => {
                let mut items: Vec<Result<ChatResponse, LlmError>> = (0..emitted)
                    .map(|i| Ok(self.chunk(&request.model, i)))
                    .collect();
                items.push(Err(LlmError::StreamError("connection reset".to_string())));
                Ok(chat_stream_from_items(items))
            }
            Behavior::StreamThenHang(emitted) => {
                let chunks: Vec<Result<ChatResponse, LlmError>> = (0..emitted)
                    .map(|i| Ok(self.chunk(&request.model, i)))
                    .collect();
                Ok(Box::pin(
                    futures::stream::iter(chunks).chain(futures::stream::pending()),
                ))
            }
            Behavior::EmptyStream => Ok(chat_stream_from_items(Vec::new())),
            Behavior::Fail(message) => Err(self.fault(&message)),
            Behavior::Hang => std::future::pending().await,
            Behavior::CancelCaller(caller) => {
                caller.cancel();
                Err(self.fault("cancelled upstream"))
            }
        }
    }
}

#[async_trait]
impl EmbeddingCapability for MockProvider {
    async fn embed(
        &self,
        request: &EmbeddingRequest,
        _cancel: &CancelHandle,
    ) -> Result<EmbeddingResponse, LlmError> {
        match self.next_behavior() {
            Behavior::Fail(message) => Err(self.fault(&message)),
            Behavior::Hang => std::future::pending().await,
            _ => Ok(EmbeddingResponse::new(
                request.input.iter().map(|_| vec![0.1, 0.2, 0.3]).collect(),
                request.model.clone(),
            )
            .with_usage(EmbeddingUsage::new(5, 5))),
        }
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    fn provider_type(&self) -> ProviderType {
        self.provider
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::all()
    }

    async fn health_check(&self, _cancel: &CancelHandle) -> Result<bool, LlmError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let health = self.health.lock().unwrap().clone();
        match health {
            Health::Healthy => Ok(true),
            Health::Unhealthy => Ok(false),
            Health::Error(message) => Err(self.fault(&message)),
            Health::Hang => std::future::pending().await,
        }
    }

    async fn list_models(&self, _cancel: &CancelHandle) -> Result<Vec<ModelInfo>, LlmError> {
        Ok(vec![ModelInfo::new("mock-model")])
    }
}

/// Hands out the scripted providers and records every instantiation.
pub struct MockFactory {
    providers: Vec<Arc<MockProvider>>,
    created: Mutex<Vec<ProviderType>>,
}

impl MockFactory {
    pub fn new(providers: &[Arc<MockProvider>]) -> Arc<Self> {
        Arc::new(Self {
            providers: providers.to_vec(),
            created: Mutex::new(Vec::new()),
        })
    }

    /// Every `create_client` call, in order
    pub fn created(&self) -> Vec<ProviderType> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClientFactory for MockFactory {
    async fn create_client(
        &self,
        provider_type: ProviderType,
    ) -> Result<Arc<dyn ProviderClient>, LlmError> {
        self.created.lock().unwrap().push(provider_type);
        self.providers
            .iter()
            .find(|p| p.provider == provider_type)
            .map(|p| p.clone() as Arc<dyn ProviderClient>)
            .ok_or_else(|| LlmError::UnsupportedProvider(provider_type.to_string()))
    }

    fn supported_types(&self) -> Vec<ProviderType> {
        self.providers.iter().map(|p| p.provider).collect()
    }
}

/// Config for `providers` with priorities 1, 2, 3... in the given order.
pub fn ranked_config(providers: &[ProviderType]) -> GatewayConfig {
    providers
        .iter()
        .enumerate()
        .fold(GatewayConfig::default(), |config, (i, provider)| {
            config.with_provider(ProviderConfig::new(*provider).with_priority(i as u32 + 1))
        })
}

pub fn orchestrator(config: GatewayConfig, factory: Arc<MockFactory>) -> ProviderOrchestrator {
    ProviderOrchestrator::new(config, factory)
}

pub fn chat_request() -> ChatRequest {
    ChatRequest::new("gpt-4o", vec![ChatMessage::user("Hello")])
}

pub fn embedding_request() -> EmbeddingRequest {
    EmbeddingRequest::new("text-embedding-3-small", vec!["a".to_string(), "b".to_string()])
}

pub fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}
