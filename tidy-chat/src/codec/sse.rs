//! Classification of the provider's server-sent events.

use serde::Deserialize;
use std::fmt;

/// Prefix of every event line the provider sends.
pub const DATA_PREFIX: &str = "data: ";

/// Payload the provider sends as its last event.
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Deserialize)]
struct ChunkEvent {
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Why an upstream line produced no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    Blank,
    NotData,
    MalformedJson(String),
    NoContent,
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscardReason::Blank => write!(f, "blank line"),
            DiscardReason::NotData => write!(f, "not a data line"),
            DiscardReason::MalformedJson(err) => write!(f, "malformed event: {err}"),
            DiscardReason::NoContent => write!(f, "no content delta"),
        }
    }
}

/// What one provider line means for the reformatted stream.
///
/// Malformed events are a deliberate `Discarded` outcome rather than an
/// error: a single bad event must not end the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamEvent {
    Delta(String),
    Done,
    Discarded(DiscardReason),
}

impl UpstreamEvent {
    pub fn classify(line: &str) -> Self {
        if line.trim().is_empty() {
            return UpstreamEvent::Discarded(DiscardReason::Blank);
        }
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return UpstreamEvent::Discarded(DiscardReason::NotData);
        };
        if payload.trim() == DONE_SENTINEL {
            return UpstreamEvent::Done;
        }

        let event: ChunkEvent = match serde_json::from_str(payload) {
            Ok(event) => event,
            Err(e) => return UpstreamEvent::Discarded(DiscardReason::MalformedJson(e.to_string())),
        };

        match event.choices.into_iter().next().and_then(|c| c.delta.content) {
            Some(content) if !content.is_empty() => UpstreamEvent::Delta(content),
            _ => UpstreamEvent::Discarded(DiscardReason::NoContent),
        }
    }
}
