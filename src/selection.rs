//! Provider selection
//!
//! Produces the ordered candidate list for one call from configuration and
//! current circuit state.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::circuit::CircuitTracker;
use crate::config::ProviderConfig;
use crate::error::OrchestratorErrorCode;
use crate::types::{OperationKind, ProviderType};

/// What a call needs from a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionCriteria {
    pub operation: OperationKind,
    /// Requested model, checked against each provider's allowlist
    pub model: Option<String>,
    /// Use exactly this provider, whatever its circuit state
    pub forced: Option<ProviderType>,
    /// Moved to the front, in the given order
    pub preferred: Vec<ProviderType>,
    pub excluded: Vec<ProviderType>,
}

impl SelectionCriteria {
    pub fn new(operation: OperationKind) -> Self {
        Self {
            operation,
            model: None,
            forced: None,
            preferred: Vec::new(),
            excluded: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_forced(mut self, provider: Option<ProviderType>) -> Self {
        self.forced = provider;
        self
    }

    pub fn with_preferred(mut self, preferred: Vec<ProviderType>) -> Self {
        self.preferred = preferred;
        self
    }

    pub fn with_excluded(mut self, excluded: Vec<ProviderType>) -> Self {
        self.excluded = excluded;
        self
    }
}

/// Ordered candidates for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub candidates: Vec<ProviderType>,
    /// Candidates came from a forced override; circuit state is ignored
    pub forced: bool,
}

/// Terminal selection failures. Callers must not retry on these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Compatible providers exist but none is selectable right now
    #[error("no provider available for {operation}")]
    NoProviderAvailable { operation: OperationKind },

    /// No enabled provider serves this operation and model
    #[error("no provider supports {operation} for model '{model}'")]
    NoCompatibleModel {
        operation: OperationKind,
        model: String,
    },
}

impl SelectionError {
    pub const fn code(&self) -> OrchestratorErrorCode {
        match self {
            Self::NoProviderAvailable { .. } => OrchestratorErrorCode::NoProviderAvailable,
            Self::NoCompatibleModel { .. } => OrchestratorErrorCode::NoCompatibleModel,
        }
    }
}

/// Selects candidates from the configured providers.
pub struct ProviderSelector {
    providers: Vec<ProviderConfig>,
    tracker: Arc<dyn CircuitTracker>,
}

impl ProviderSelector {
    pub fn new(providers: Vec<ProviderConfig>, tracker: Arc<dyn CircuitTracker>) -> Self {
        Self { providers, tracker }
    }

    pub fn select(&self, criteria: &SelectionCriteria) -> Result<Selection, SelectionError> {
        if let Some(forced) = criteria.forced {
            return self.select_forced(forced, criteria);
        }

        let mut compatible: Vec<&ProviderConfig> = self
            .providers
            .iter()
            .filter(|p| p.enabled && self.is_compatible(p, criteria))
            .collect();

        if compatible.is_empty() {
            return Err(self.incompatible(criteria));
        }

        // Stable: equal priorities keep configuration order
        compatible.sort_by_key(|p| p.priority);

        let mut candidates: Vec<ProviderType> = compatible
            .into_iter()
            .map(|p| p.provider_type)
            .filter(|p| !criteria.excluded.contains(p))
            .filter(|p| !self.tracker.is_blacklisted(*p))
            .collect();

        if !criteria.preferred.is_empty() {
            let preferred = criteria
                .preferred
                .iter()
                .copied()
                .filter(|p| candidates.contains(p));
            let mut ordered: Vec<ProviderType> = Vec::with_capacity(candidates.len());
            for p in preferred {
                if !ordered.contains(&p) {
                    ordered.push(p);
                }
            }
            ordered.extend(candidates.iter().filter(|p| !criteria.preferred.contains(p)));
            candidates = ordered;
        }

        if candidates.is_empty() {
            debug!(operation = %criteria.operation, "No selectable provider");
            return Err(SelectionError::NoProviderAvailable {
                operation: criteria.operation,
            });
        }

        debug!(
            operation = %criteria.operation,
            count = candidates.len(),
            first = %candidates[0],
            "Selected providers"
        );
        Ok(Selection {
            candidates,
            forced: false,
        })
    }

    fn select_forced(
        &self,
        forced: ProviderType,
        criteria: &SelectionCriteria,
    ) -> Result<Selection, SelectionError> {
        let Some(config) = self
            .providers
            .iter()
            .find(|p| p.provider_type == forced && p.enabled)
        else {
            return Err(SelectionError::NoProviderAvailable {
                operation: criteria.operation,
            });
        };

        if !self.is_compatible(config, criteria) {
            return Err(self.incompatible(criteria));
        }

        debug!(provider = %forced, "Using forced provider");
        Ok(Selection {
            candidates: vec![forced],
            forced: true,
        })
    }

    fn is_compatible(&self, config: &ProviderConfig, criteria: &SelectionCriteria) -> bool {
        config.supports(criteria.operation)
            && criteria
                .model
                .as_deref()
                .is_none_or(|model| config.serves_model(model))
    }

    fn incompatible(&self, criteria: &SelectionCriteria) -> SelectionError {
        SelectionError::NoCompatibleModel {
            operation: criteria.operation,
            model: criteria.model.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::InMemoryCircuitTracker;
    use crate::config::CircuitBreakerConfig;
    use std::time::Duration;

    fn setup(providers: Vec<ProviderConfig>) -> (ProviderSelector, Arc<InMemoryCircuitTracker>) {
        let tracker = Arc::new(InMemoryCircuitTracker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            cool_down: Duration::from_secs(30),
        }));
        (ProviderSelector::new(providers, tracker.clone()), tracker)
    }

    fn abc() -> Vec<ProviderConfig> {
        vec![
            ProviderConfig::new(ProviderType::Gemini).with_priority(3),
            ProviderConfig::new(ProviderType::OpenAi).with_priority(1),
            ProviderConfig::new(ProviderType::Anthropic).with_priority(2),
        ]
    }

    fn chat() -> SelectionCriteria {
        SelectionCriteria::new(OperationKind::Chat)
    }

    #[test]
    fn orders_by_priority_then_configuration_order() {
        let (selector, _) = setup(vec![
            ProviderConfig::new(ProviderType::Mistral).with_priority(5),
            ProviderConfig::new(ProviderType::Cohere).with_priority(1),
            ProviderConfig::new(ProviderType::Ollama).with_priority(5),
        ]);
        let selection = selector.select(&chat()).unwrap();
        assert_eq!(
            selection.candidates,
            vec![ProviderType::Cohere, ProviderType::Mistral, ProviderType::Ollama]
        );
        assert!(!selection.forced);
    }

    #[test]
    fn excludes_disabled_incapable_and_blacklisted() {
        let (selector, tracker) = setup(vec![
            ProviderConfig::new(ProviderType::OpenAi).with_priority(1),
            ProviderConfig::new(ProviderType::Anthropic)
                .with_priority(2)
                .without_embeddings(),
            ProviderConfig::new(ProviderType::Gemini)
                .with_priority(3)
                .with_enabled(false),
            ProviderConfig::new(ProviderType::Cohere).with_priority(4),
        ]);
        tracker.record_failure(ProviderType::OpenAi, "down");

        let selection = selector
            .select(&SelectionCriteria::new(OperationKind::Embedding))
            .unwrap();
        assert_eq!(selection.candidates, vec![ProviderType::Cohere]);
    }

    #[test]
    fn forced_provider_bypasses_circuit() {
        let (selector, tracker) = setup(abc());
        tracker.record_failure(ProviderType::Anthropic, "down");

        let selection = selector
            .select(&chat().with_forced(Some(ProviderType::Anthropic)))
            .unwrap();
        assert_eq!(selection.candidates, vec![ProviderType::Anthropic]);
        assert!(selection.forced);
    }

    #[test]
    fn forced_provider_must_be_configured_and_compatible() {
        let (selector, _) = setup(vec![
            ProviderConfig::new(ProviderType::OpenAi).with_models(["gpt-"]),
        ]);
        assert_eq!(
            selector
                .select(&chat().with_forced(Some(ProviderType::Mistral)))
                .unwrap_err()
                .code(),
            OrchestratorErrorCode::NoProviderAvailable
        );
        assert_eq!(
            selector
                .select(
                    &chat()
                        .with_model("claude-3")
                        .with_forced(Some(ProviderType::OpenAi))
                )
                .unwrap_err()
                .code(),
            OrchestratorErrorCode::NoCompatibleModel
        );
    }

    #[test]
    fn all_blacklisted_is_no_provider_available() {
        let (selector, tracker) = setup(abc());
        for p in [ProviderType::OpenAi, ProviderType::Anthropic, ProviderType::Gemini] {
            tracker.record_failure(p, "down");
        }
        assert_eq!(
            selector.select(&chat()).unwrap_err(),
            SelectionError::NoProviderAvailable {
                operation: OperationKind::Chat
            }
        );
    }

    #[test]
    fn unknown_model_is_no_compatible_model() {
        let (selector, _) = setup(vec![
            ProviderConfig::new(ProviderType::OpenAi).with_models(["gpt-4o"]),
            ProviderConfig::new(ProviderType::Anthropic).with_models(["claude-"]),
        ]);
        let err = selector
            .select(&chat().with_model("llama-3"))
            .unwrap_err();
        assert_eq!(err.code(), OrchestratorErrorCode::NoCompatibleModel);

        let selection = selector
            .select(&chat().with_model("claude-3-5-sonnet"))
            .unwrap();
        assert_eq!(selection.candidates, vec![ProviderType::Anthropic]);
    }

    #[test]
    fn preferred_and_excluded() {
        let (selector, _) = setup(abc());
        let selection = selector
            .select(
                &chat()
                    .with_preferred(vec![ProviderType::Gemini, ProviderType::Mistral])
                    .with_excluded(vec![ProviderType::OpenAi]),
            )
            .unwrap();
        assert_eq!(
            selection.candidates,
            vec![ProviderType::Gemini, ProviderType::Anthropic]
        );
    }
}
