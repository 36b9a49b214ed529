//! Provider client capability traits
//!
//! The gateway core consumes provider clients only through these traits;
//! wire encoding, auth and transport live behind them.
//!
//! ## Module Organization
//!
//! - **`capabilities`** - `ProviderCapabilities` flags
//! - **`chat`** - `ChatCapability` (completion and streaming completion)
//! - **`embedding`** - `EmbeddingCapability`
//! - **`client`** - `ProviderClient`, the full per-provider contract

pub mod capabilities;
pub mod chat;
pub mod client;
pub mod embedding;

pub use capabilities::ProviderCapabilities;
pub use chat::ChatCapability;
pub use client::ProviderClient;
pub use embedding::EmbeddingCapability;
