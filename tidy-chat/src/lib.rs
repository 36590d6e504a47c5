//! Streaming chat protocol for the cleaning-services chat widget.
//!
//! The crate is organised the way the widget's data flows:
//!
//! - [`domain`] holds the message model, the reformatted wire format and errors
//! - [`codec`] turns raw byte chunks into lines and classifies upstream SSE events
//! - [`services`] contains the [`StreamReformatter`] and the provider seam
//! - [`adapter`] plugs in reqwest (upstream provider) and axum (inbound route)

pub mod adapter;
pub mod codec;
pub mod domain;
pub mod services;

pub use codec::{DiscardReason, LineBuffer, MAX_LINE_BYTES, UpstreamEvent};
pub use domain::{
    ChatError, ChatMessage, ChatRequest, FinishReason, IncomingMessage, Message, MessagePart,
    Role, StreamPart,
};
pub use services::{ByteStream, CompletionProvider, CompletionRequest, StreamReformatter};

#[cfg(feature = "http-client")]
pub use adapter::OpenAiProvider;
#[cfg(feature = "http-server")]
pub use adapter::{ChatRouteState, chat_router};
