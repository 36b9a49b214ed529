//! Provider identity.
//!
//! The provider set is closed at build time: every backend the gateway can
//! talk to is a `ProviderType` variant, and each variant belongs to exactly one
//! `ProviderFamily` (the wire client implementation that serves it).

use serde::{Deserialize, Serialize};

/// Provider type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    #[serde(rename = "openai", alias = "open_ai")]
    OpenAi,
    AzureOpenAi,
    Anthropic,
    Gemini,
    Bedrock,
    Mistral,
    Cohere,
    HuggingFace,
    Ollama,
    Vllm,
    OvhCloud,
    Scaleway,
}

impl ProviderType {
    /// Every provider type, in declaration order.
    pub const ALL: [ProviderType; 12] = [
        Self::OpenAi,
        Self::AzureOpenAi,
        Self::Anthropic,
        Self::Gemini,
        Self::Bedrock,
        Self::Mistral,
        Self::Cohere,
        Self::HuggingFace,
        Self::Ollama,
        Self::Vllm,
        Self::OvhCloud,
        Self::Scaleway,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::AzureOpenAi => "azure_open_ai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Bedrock => "bedrock",
            Self::Mistral => "mistral",
            Self::Cohere => "cohere",
            Self::HuggingFace => "hugging_face",
            Self::Ollama => "ollama",
            Self::Vllm => "vllm",
            Self::OvhCloud => "ovh_cloud",
            Self::Scaleway => "scaleway",
        }
    }

    /// Parse a provider name. Accepts the canonical names plus a few common aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        let provider = match normalized.as_str() {
            "openai" | "open_ai" => Self::OpenAi,
            "azure_open_ai" | "azure_openai" | "azure" => Self::AzureOpenAi,
            "anthropic" | "claude" => Self::Anthropic,
            "gemini" | "google" | "google_gemini" => Self::Gemini,
            "bedrock" | "aws_bedrock" => Self::Bedrock,
            "mistral" => Self::Mistral,
            "cohere" => Self::Cohere,
            "hugging_face" | "huggingface" => Self::HuggingFace,
            "ollama" => Self::Ollama,
            "vllm" => Self::Vllm,
            "ovh_cloud" | "ovhcloud" => Self::OvhCloud,
            "scaleway" => Self::Scaleway,
            _ => return None,
        };
        Some(provider)
    }

    /// Wire client family serving this provider type.
    pub const fn family(self) -> ProviderFamily {
        match self {
            Self::OpenAi
            | Self::AzureOpenAi
            | Self::Mistral
            | Self::Vllm
            | Self::OvhCloud
            | Self::Scaleway => ProviderFamily::OpenAiCompatible,
            Self::Anthropic => ProviderFamily::Anthropic,
            Self::Gemini => ProviderFamily::Gemini,
            Self::Bedrock => ProviderFamily::Bedrock,
            Self::Cohere => ProviderFamily::Cohere,
            Self::HuggingFace => ProviderFamily::HuggingFace,
            Self::Ollama => ProviderFamily::Ollama,
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire client implementation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFamily {
    OpenAiCompatible,
    Anthropic,
    Gemini,
    Bedrock,
    Cohere,
    HuggingFace,
    Ollama,
}

/// Kind of operation a request needs from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Chat,
    Streaming,
    Embedding,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chat => f.write_str("chat"),
            Self::Streaming => f.write_str("streaming"),
            Self::Embedding => f.write_str("embedding"),
        }
    }
}
