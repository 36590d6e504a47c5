//! Domain types shared by the server and the client side of the widget.

pub mod error;
pub mod message;
pub mod protocol;

pub use error::ChatError;
pub use message::{ChatMessage, ChatRequest, IncomingMessage, Message, MessagePart, Role};
pub use protocol::{CONTENT_TYPE, DATA_STREAM_HEADER, DATA_STREAM_VERSION, FinishReason, StreamPart};
