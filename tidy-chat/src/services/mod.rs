//! Services that sit between the widget and the completion provider.

pub mod provider;
pub mod reformatter;

pub use provider::{ByteStream, CompletionProvider, CompletionRequest};
pub use reformatter::{EventTranslator, StreamReformatter, reformat};
