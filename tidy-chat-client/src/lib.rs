//! Building blocks for tidy-chat front ends.
//!
//! A front end owns a [`ConversationHandle`], renders from its snapshots, and
//! drives turns through a [`ReplyRenderer`] over some [`ChatTransport`].

pub mod renderer;
pub mod state;
pub mod transport;

pub use renderer::{APOLOGY, ReplyAccumulator, ReplyRenderer, TurnError, TurnOutcome, TurnPhase};
pub use state::{ConversationHandle, ConversationState};
pub use transport::{ChatTransport, HttpTransport, ReplyStream, TransportError};

pub use tidy_chat::{ChatMessage, Message, Role};
