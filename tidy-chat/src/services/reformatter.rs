//! Provider SSE in, widget reply stream out.

use std::sync::Arc;

use async_stream::try_stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{debug, trace, warn};

use super::provider::{ByteStream, CompletionProvider, CompletionRequest};
use crate::codec::{LineBuffer, UpstreamEvent};
use crate::domain::{ChatError, ChatMessage, ChatRequest, StreamPart};

/// Forwards a conversation to the provider with the business's system prompt
/// and re-encodes the reply.
///
/// Holds only immutable configuration, so one instance serves any number of
/// concurrent requests; each call owns its own upstream connection.
#[derive(Clone)]
pub struct StreamReformatter {
    provider: Arc<dyn CompletionProvider>,
    system_prompt: Arc<str>,
    model: Arc<str>,
}

impl StreamReformatter {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        system_prompt: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let system_prompt: String = system_prompt.into();
        let model: String = model.into();
        Self {
            provider,
            system_prompt: system_prompt.into(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The system message followed by the conversation as posted.
    pub fn outgoing_messages(&self, conversation: Vec<ChatMessage>) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(ChatMessage::system(self.system_prompt.as_ref()));
        messages.extend(conversation);
        messages
    }

    /// Open the upstream completion and return the reformatted stream.
    ///
    /// Provider rejections surface here, before any byte of the reply exists.
    pub async fn respond(&self, request: ChatRequest) -> Result<ByteStream, ChatError> {
        let messages = self.outgoing_messages(request.into_conversation());
        debug!(
            model = %self.model,
            messages = messages.len(),
            "requesting streaming completion"
        );

        let completion = CompletionRequest::new(self.model.as_ref(), messages);
        let upstream = self.provider.stream_completion(&completion).await?;
        Ok(reformat(upstream))
    }
}

/// Line-level translation from provider events to reply parts.
#[derive(Debug, Default)]
pub struct EventTranslator {
    finished: bool,
    deltas: usize,
}

impl EventTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one provider line. Lines after `[DONE]` are ignored.
    pub fn feed(&mut self, line: &str) -> Option<StreamPart> {
        if self.finished {
            return None;
        }
        match UpstreamEvent::classify(line) {
            UpstreamEvent::Delta(text) => {
                self.deltas += 1;
                Some(StreamPart::Text(text))
            }
            UpstreamEvent::Done => {
                self.finished = true;
                Some(StreamPart::finish())
            }
            UpstreamEvent::Discarded(reason) => {
                trace!(%reason, "skipping upstream line");
                None
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn deltas(&self) -> usize {
        self.deltas
    }
}

/// Re-encode a provider SSE byte stream as the widget's line protocol.
///
/// Emits one `0:` line per content delta and a single `d:` line on `[DONE]`,
/// after which the upstream is no longer read. If the upstream closes without
/// `[DONE]` the output simply ends.
pub fn reformat(upstream: ByteStream) -> ByteStream {
    Box::pin(reformat_lines(upstream))
}

fn reformat_lines(mut upstream: ByteStream) -> impl Stream<Item = Result<Bytes, ChatError>> + Send {
    try_stream! {
        let mut lines = LineBuffer::new();
        let mut translator = EventTranslator::new();

        while let Some(chunk) = upstream.next().await {
            let chunk = chunk?;
            for line in lines.push(&chunk) {
                if let Some(part) = translator.feed(&line) {
                    yield Bytes::from(part.encode()?);
                }
                if translator.is_finished() {
                    break;
                }
            }
            if translator.is_finished() {
                break;
            }
        }

        if !translator.is_finished() {
            if let Some(line) = lines.finish() {
                if let Some(part) = translator.feed(&line) {
                    yield Bytes::from(part.encode()?);
                }
            }
        }

        if lines.dropped_lines() > 0 {
            warn!(dropped = lines.dropped_lines(), "skipped overlong upstream lines");
        }
        if translator.is_finished() {
            if lines.has_pending() {
                debug!("ignoring upstream bytes after [DONE]");
            }
            debug!(deltas = translator.deltas(), "completion finished");
        } else {
            debug!(
                deltas = translator.deltas(),
                "upstream closed without [DONE]; ending reply without finish line"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translator_stops_after_done() {
        let mut translator = EventTranslator::new();
        assert_eq!(
            translator.feed(r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#),
            Some(StreamPart::text("Hi"))
        );
        assert_eq!(translator.feed("data: [DONE]"), Some(StreamPart::finish()));
        assert!(translator.is_finished());
        assert_eq!(
            translator.feed(r#"data: {"choices":[{"delta":{"content":"late"}}]}"#),
            None
        );
        assert_eq!(translator.feed("data: [DONE]"), None);
        assert_eq!(translator.deltas(), 1);
    }

    #[test]
    fn translator_skips_garbage() {
        let mut translator = EventTranslator::new();
        assert_eq!(translator.feed("data: {oops"), None);
        assert_eq!(translator.feed(""), None);
        assert_eq!(translator.feed("retry: 100"), None);
        assert!(!translator.is_finished());
    }
}
