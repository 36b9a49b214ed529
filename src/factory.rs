//! Client factory
//!
//! Turns a `ProviderType` into a ready `ProviderClient`. `ProviderRegistry`
//! is the default factory: it resolves the provider's `ProviderFamily`, hands
//! the provider's configuration to the builder registered for that family, and
//! keeps built clients in an LRU cache with optional TTL.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex as TokioMutex;
use tokio::time::Instant;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::LlmError;
use crate::traits::ProviderClient;
use crate::types::{ProviderFamily, ProviderType};

/// Source of provider clients consumed by the orchestrator.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Build (or fetch from cache) the client for `provider_type`.
    ///
    /// Unknown, unconfigured or disabled types fail with
    /// `LlmError::UnsupportedProvider`.
    async fn create_client(
        &self,
        provider_type: ProviderType,
    ) -> Result<Arc<dyn ProviderClient>, LlmError>;

    /// Every provider type this factory can build, in configuration order.
    fn supported_types(&self) -> Vec<ProviderType>;
}

/// Builds clients for one wire family from a provider's configuration.
#[async_trait]
pub trait ProviderBuilder: Send + Sync {
    fn family(&self) -> ProviderFamily;

    async fn build(&self, config: &ProviderConfig) -> Result<Arc<dyn ProviderClient>, LlmError>;
}

/// Cache entry with TTL support
struct CacheEntry {
    client: Arc<dyn ProviderClient>,
    created_at: Instant,
}

impl CacheEntry {
    fn new(client: Arc<dyn ProviderClient>) -> Self {
        Self {
            client,
            created_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        if let Some(ttl) = ttl {
            self.created_at.elapsed() > ttl
        } else {
            false
        }
    }
}

/// Options for the registry client cache.
#[derive(Debug, Clone, Default)]
pub struct RegistryOptions {
    /// Maximum number of cached clients (LRU eviction when exceeded)
    pub max_cache_entries: Option<usize>,
    /// Time-to-live for cached clients (None = no expiration)
    pub client_ttl: Option<Duration>,
}

/// Default `ClientFactory`.
pub struct ProviderRegistry {
    providers: Vec<ProviderConfig>,
    builders: HashMap<ProviderFamily, Arc<dyn ProviderBuilder>>,
    cache: Arc<TokioMutex<LruCache<ProviderType, CacheEntry>>>,
    client_ttl: Option<Duration>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<ProviderConfig>) -> Self {
        Self::with_options(providers, RegistryOptions::default())
    }

    pub fn with_options(providers: Vec<ProviderConfig>, options: RegistryOptions) -> Self {
        let capacity = options
            .max_cache_entries
            .and_then(NonZeroUsize::new)
            .or_else(|| NonZeroUsize::new(ProviderType::ALL.len()))
            .unwrap_or(NonZeroUsize::MIN);

        Self {
            providers,
            builders: HashMap::new(),
            cache: Arc::new(TokioMutex::new(LruCache::new(capacity))),
            client_ttl: options.client_ttl,
        }
    }

    /// Register the builder for its family, replacing any previous one.
    pub fn register_builder(&mut self, builder: Arc<dyn ProviderBuilder>) {
        self.builders.insert(builder.family(), builder);
    }

    pub fn with_builder(mut self, builder: Arc<dyn ProviderBuilder>) -> Self {
        self.register_builder(builder);
        self
    }

    /// Drop every cached client.
    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    fn enabled_config(&self, provider_type: ProviderType) -> Option<&ProviderConfig> {
        self.providers
            .iter()
            .find(|p| p.provider_type == provider_type && p.enabled)
    }
}

#[async_trait]
impl ClientFactory for ProviderRegistry {
    async fn create_client(
        &self,
        provider_type: ProviderType,
    ) -> Result<Arc<dyn ProviderClient>, LlmError> {
        let config = self.enabled_config(provider_type).ok_or_else(|| {
            LlmError::UnsupportedProvider(format!(
                "{provider_type} is not configured or is disabled"
            ))
        })?;

        let family = provider_type.family();
        let builder = self.builders.get(&family).ok_or_else(|| {
            LlmError::UnsupportedProvider(format!(
                "no client builder registered for {provider_type} ({family:?})"
            ))
        })?;

        let mut cache = self.cache.lock().await;
        if let Some(entry) = cache.get(&provider_type) {
            if !entry.is_expired(self.client_ttl) {
                return Ok(entry.client.clone());
            }
            cache.pop(&provider_type);
        }

        // Release lock before the async build
        drop(cache);
        debug!(provider = %provider_type, "Building provider client");
        let client = builder.build(config).await?;

        let mut cache = self.cache.lock().await;
        cache.put(provider_type, CacheEntry::new(client.clone()));

        Ok(client)
    }

    fn supported_types(&self) -> Vec<ProviderType> {
        self.providers
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.provider_type)
            .collect()
    }
}
