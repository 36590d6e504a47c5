//! Explicit UI state for the chat widget.
//!
//! All mutation goes through the transition methods below; there is no
//! ambient state. [`ConversationHandle`] publishes a snapshot after every
//! transition so a UI can redraw without blocking the turn in progress.

use std::sync::Arc;

use tidy_chat::{ChatMessage, Message};
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    messages: Vec<Message>,
    is_open: bool,
    is_loading: bool,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A conversation that opens with an assistant greeting.
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let mut state = Self::new();
        state.append_message(Message::new(tidy_chat::Role::Assistant, greeting));
        state
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn append_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the content of the message with `id`. Returns `false` when no
    /// such message exists.
    pub fn update_message(&mut self, id: &str, content: impl Into<String>) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.content = content.into();
                true
            }
            None => false,
        }
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub fn set_open(&mut self, open: bool) {
        self.is_open = open;
    }

    pub fn toggle_open(&mut self) {
        self.is_open = !self.is_open;
    }

    /// Drop every message. The loading flag belongs to the turn in flight
    /// and is left for that turn to release.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Conversation in send order, as role/content pairs.
    pub fn chat_history(&self) -> Vec<ChatMessage> {
        self.messages.iter().map(Message::to_chat_message).collect()
    }
}

/// Shared, observable owner of a [`ConversationState`].
#[derive(Debug, Clone)]
pub struct ConversationHandle {
    tx: Arc<watch::Sender<ConversationState>>,
}

impl ConversationHandle {
    pub fn new(state: ConversationState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self { tx: Arc::new(tx) }
    }

    /// Receiver that is notified after every transition.
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ConversationState {
        self.tx.borrow().clone()
    }

    /// Apply a compound transition. Subscribers are notified only when it
    /// returns `true`.
    pub fn update(&self, transition: impl FnOnce(&mut ConversationState) -> bool) -> bool {
        self.tx.send_if_modified(transition)
    }

    pub fn append_message(&self, message: Message) {
        self.tx.send_modify(|state| state.append_message(message));
    }

    pub fn update_message(&self, id: &str, content: &str) -> bool {
        self.tx
            .send_if_modified(|state| state.update_message(id, content))
    }

    pub fn set_loading(&self, loading: bool) {
        self.tx
            .send_if_modified(|state| std::mem::replace(&mut state.is_loading, loading) != loading);
    }

    pub fn set_open(&self, open: bool) {
        self.tx
            .send_if_modified(|state| std::mem::replace(&mut state.is_open, open) != open);
    }

    pub fn toggle_open(&self) {
        self.tx.send_modify(ConversationState::toggle_open);
    }

    pub fn clear(&self) {
        self.tx.send_modify(ConversationState::clear);
    }
}

impl Default for ConversationHandle {
    fn default() -> Self {
        Self::new(ConversationState::default())
    }
}
