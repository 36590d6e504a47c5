use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Serialize;

use crate::domain::{ChatError, ChatMessage};

/// Raw response bytes as they arrive from the network.
pub type ByteStream = BoxStream<'static, Result<Bytes, ChatError>>;

/// Body of a streaming chat-completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: true,
        }
    }
}

/// A chat-completion backend that streams server-sent events.
///
/// Implementations must settle the HTTP status before returning: a rejected
/// request is an `Err`, never a stream that fails on its first chunk.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn stream_completion(&self, request: &CompletionRequest)
    -> Result<ByteStream, ChatError>;
}
