//! Utility modules for llm-relay
//!
//! This module contains cancellation and deadline helpers shared by the
//! coordinator, the streaming loop and the health query.

pub mod cancel;

pub use cancel::{CallScope, CancelHandle, Interrupt, new_cancel_handle};
