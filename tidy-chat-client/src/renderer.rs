//! Drives one chat turn and streams the reply into the conversation.
//!
//! A turn moves `Idle -> Sending -> Streaming -> Done`, or ends in `Failed`
//! when the reply cannot be obtained, or `Cancelled` when [`ReplyRenderer::cancel`]
//! is called mid-turn. Deltas are folded sequentially: every `0:` line updates
//! the assistant placeholder before the next line is looked at.

use std::sync::{Mutex, PoisonError};

use futures::StreamExt;
use thiserror::Error;
use tidy_chat::{LineBuffer, Message, StreamPart};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::state::ConversationHandle;
use crate::transport::ChatTransport;

/// Shown in place of the reply when a turn fails.
pub const APOLOGY: &str = "Sorry, I'm having trouble connecting right now. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Sending,
    Streaming,
    Done,
    Failed,
    Cancelled,
}

/// Why a turn was not started.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TurnError {
    #[error("a reply is already streaming")]
    Busy,

    #[error("message is empty")]
    EmptyMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Id of the assistant message this turn filled in.
    pub message_id: String,
    pub phase: TurnPhase,
    pub content: String,
    /// Whether the stream carried its finish line. A `Done` turn without it
    /// ended because the connection closed.
    pub finished: bool,
}

/// Folds reply-stream bytes into the assistant text.
///
/// Independent of how the bytes are chunked. Lines other than `0:` are
/// ignored, and nothing is appended once the finish line has been seen.
#[derive(Debug, Default)]
pub struct ReplyAccumulator {
    lines: LineBuffer,
    text: String,
    finished: bool,
}

impl ReplyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, calling `on_delta` with the full text after every
    /// appended delta.
    pub fn push_with(&mut self, chunk: &[u8], mut on_delta: impl FnMut(&str)) {
        for line in self.lines.push(chunk) {
            if self.apply(&line) {
                on_delta(&self.text);
            }
        }
    }

    /// Feed a chunk. Returns whether the text changed.
    pub fn push(&mut self, chunk: &[u8]) -> bool {
        let mut changed = false;
        self.push_with(chunk, |_| changed = true);
        changed
    }

    /// Process a trailing unterminated line once the stream has closed.
    pub fn finish_with(&mut self, mut on_delta: impl FnMut(&str)) {
        if let Some(line) = self.lines.finish() {
            if self.apply(&line) {
                on_delta(&self.text);
            }
        }
    }

    pub fn finish(&mut self) -> bool {
        let mut changed = false;
        self.finish_with(|_| changed = true);
        changed
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn saw_finish(&self) -> bool {
        self.finished
    }

    pub fn into_text(self) -> String {
        self.text
    }

    fn apply(&mut self, line: &str) -> bool {
        if self.finished {
            return false;
        }
        match StreamPart::decode_line(line) {
            Some(StreamPart::Text(delta)) => {
                self.text.push_str(&delta);
                true
            }
            Some(StreamPart::Finish { .. }) => {
                self.finished = true;
                false
            }
            None => false,
        }
    }
}

#[derive(Debug)]
struct TurnSlot {
    phase: TurnPhase,
    cancel: Option<CancellationToken>,
}

impl TurnSlot {
    fn is_active(&self) -> bool {
        matches!(self.phase, TurnPhase::Sending | TurnPhase::Streaming)
    }
}

/// Runs chat turns against a [`ChatTransport`].
pub struct ReplyRenderer<T> {
    transport: T,
    slot: Mutex<TurnSlot>,
}

impl<T: ChatTransport> ReplyRenderer<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            slot: Mutex::new(TurnSlot {
                phase: TurnPhase::Idle,
                cancel: None,
            }),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Phase of the current or most recent turn.
    pub fn phase(&self) -> TurnPhase {
        self.slot().phase
    }

    /// Abort the turn in flight, if any. Text received so far is kept.
    pub fn cancel(&self) {
        if let Some(token) = &self.slot().cancel {
            token.cancel();
        }
    }

    /// Send `content` as a user message and stream the reply into
    /// `conversation`.
    ///
    /// Failures to reach the chat endpoint are absorbed: the placeholder shows
    /// [`APOLOGY`] and the outcome reports `Failed`. Only a turn that could not
    /// start returns `Err`.
    pub async fn run_turn(
        &self,
        conversation: &ConversationHandle,
        content: impl Into<String>,
    ) -> Result<TurnOutcome, TurnError> {
        let content: String = content.into();
        if content.trim().is_empty() {
            return Err(TurnError::EmptyMessage);
        }

        let user = Message::user(content);
        let placeholder = Message::assistant_placeholder();
        let message_id = placeholder.id.clone();

        // The renderer and the conversation are claimed under the slot lock,
        // so a concurrent `cancel()` always finds this turn's token.
        let cancel = CancellationToken::new();
        {
            let mut slot = self.slot();
            if slot.is_active() {
                return Err(TurnError::Busy);
            }
            let started = conversation.update(|state| {
                if state.is_loading() {
                    return false;
                }
                state.append_message(user);
                state.append_message(placeholder);
                state.set_loading(true);
                true
            });
            if !started {
                return Err(TurnError::Busy);
            }
            slot.phase = TurnPhase::Sending;
            slot.cancel = Some(cancel.clone());
        }

        let outcome = self.stream_reply(conversation, &message_id, &cancel).await;

        conversation.set_loading(false);
        {
            let mut slot = self.slot();
            slot.phase = outcome.phase;
            slot.cancel = None;
        }
        info!(
            message_id = %outcome.message_id,
            phase = ?outcome.phase,
            finished = outcome.finished,
            chars = outcome.content.chars().count(),
            "chat turn ended"
        );
        Ok(outcome)
    }

    async fn stream_reply(
        &self,
        conversation: &ConversationHandle,
        message_id: &str,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        let history: Vec<_> = conversation
            .snapshot()
            .messages()
            .iter()
            .filter(|m| m.id != message_id)
            .map(Message::to_chat_message)
            .collect();
        debug!(messages = history.len(), "sending chat turn");

        let outcome = |phase, content: String, finished| TurnOutcome {
            message_id: message_id.to_string(),
            phase,
            content,
            finished,
        };

        let sent = tokio::select! {
            _ = cancel.cancelled() => None,
            sent = self.transport.send(&history) => Some(sent),
        };
        let mut reply = match sent {
            None => return outcome(TurnPhase::Cancelled, String::new(), false),
            Some(Ok(reply)) => reply,
            Some(Err(e)) => {
                warn!(error = %e, "chat turn failed before streaming");
                conversation.update_message(message_id, APOLOGY);
                return outcome(TurnPhase::Failed, APOLOGY.to_string(), false);
            }
        };

        self.slot().phase = TurnPhase::Streaming;
        let mut accumulator = ReplyAccumulator::new();
        let publish = |text: &str| {
            conversation.update_message(message_id, text);
        };

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("chat turn cancelled mid-stream");
                    let content = accumulator.into_text();
                    return outcome(TurnPhase::Cancelled, content, false);
                }
                chunk = reply.next() => chunk,
            };
            match chunk {
                Some(Ok(bytes)) => accumulator.push_with(&bytes, publish),
                Some(Err(e)) => {
                    warn!(error = %e, "reply stream broke");
                    conversation.update_message(message_id, APOLOGY);
                    return outcome(TurnPhase::Failed, APOLOGY.to_string(), false);
                }
                None => break,
            }
        }

        accumulator.finish_with(publish);
        let finished = accumulator.saw_finish();
        if !finished {
            warn!("reply stream closed without a finish line");
        }
        outcome(TurnPhase::Done, accumulator.into_text(), finished)
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, TurnSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
