//! How a front end reaches the chat endpoint.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream::BoxStream};
use reqwest::Client;
use thiserror::Error;
use tidy_chat::{ChatMessage, ChatRequest, domain::DATA_STREAM_HEADER};
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("chat request failed: {0}")]
    Request(String),

    #[error("chat endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("reply stream broke: {0}")]
    Body(String),
}

/// Reply bytes in the line-prefixed stream format.
pub type ReplyStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Sends a conversation and returns the raw reply stream.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, messages: &[ChatMessage]) -> Result<ReplyStream, TransportError>;
}

/// Posts to a tidy-chat server over HTTP.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    /// `endpoint` is the full URL of the chat route, e.g.
    /// `http://localhost:3000/api/chat`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, messages: &[ChatMessage]) -> Result<ReplyStream, TransportError> {
        let body = ChatRequest::new(messages.iter().cloned());
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %body, "chat endpoint rejected the turn");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if !response.headers().contains_key(DATA_STREAM_HEADER) {
            debug!(endpoint = %self.endpoint, "reply is missing the data stream marker header");
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Body(e.to_string())))
            .boxed())
    }
}
