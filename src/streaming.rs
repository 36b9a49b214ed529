//! Streaming types
//!
//! Provider clients hand back a `ChatStream`; the orchestrator drains it into
//! a buffer before anything reaches the caller.

use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::error::LlmError;
use crate::types::ChatResponse;

/// Stream of response chunks from one provider.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatResponse, LlmError>> + Send>>;

/// Build a `ChatStream` from a fixed sequence of items.
pub fn chat_stream_from_items<I>(items: I) -> ChatStream
where
    I: IntoIterator<Item = Result<ChatResponse, LlmError>>,
    I::IntoIter: Send + 'static,
{
    Box::pin(futures::stream::iter(items))
}

/// Drain `stream` to its end.
///
/// Stops at the first faulted item; chunks read before the fault are dropped
/// with the buffer.
pub async fn collect_chunks(mut stream: ChatStream) -> Result<Vec<ChatResponse>, LlmError> {
    let mut buffer = Vec::new();
    while let Some(item) = stream.next().await {
        buffer.push(item?);
    }
    Ok(buffer)
}
