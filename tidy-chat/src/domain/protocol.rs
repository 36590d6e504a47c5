//! The line-prefixed reply stream consumed by the widget.
//!
//! Every line is `<code>:<json>` followed by `\n`:
//!
//! ```text
//! 0:"Yes"
//! 0:", we do."
//! d:{"type":"finish","finishReason":"stop"}
//! ```
//!
//! `0:` lines carry one JSON-encoded text delta each, `d:` closes the stream.

use serde::{Deserialize, Serialize};

/// Content type of the reply stream.
pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Header that marks a response as a data stream, and its protocol version.
pub const DATA_STREAM_HEADER: &str = "x-vercel-ai-data-stream";
pub const DATA_STREAM_VERSION: &str = "v1";

const TEXT_PREFIX: &str = "0:";
const FINISH_PREFIX: &str = "d:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    Stop,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinishPayload {
    #[serde(rename = "type")]
    kind: String,
    finish_reason: FinishReason,
}

/// One line of the reply stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPart {
    Text(String),
    Finish { finish_reason: FinishReason },
}

impl StreamPart {
    pub fn text(delta: impl Into<String>) -> Self {
        StreamPart::Text(delta.into())
    }

    pub fn finish() -> Self {
        StreamPart::Finish {
            finish_reason: FinishReason::Stop,
        }
    }

    /// Encode as a newline-terminated wire line.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let payload = match self {
            StreamPart::Text(delta) => format!("{TEXT_PREFIX}{}", serde_json::to_string(delta)?),
            StreamPart::Finish { finish_reason } => {
                let payload = FinishPayload {
                    kind: "finish".to_string(),
                    finish_reason: *finish_reason,
                };
                format!("{FINISH_PREFIX}{}", serde_json::to_string(&payload)?)
            }
        };
        Ok(payload + "\n")
    }

    /// Decode a single line without its terminator. Returns `None` for
    /// prefixes this protocol does not know and for unparseable payloads.
    pub fn decode_line(line: &str) -> Option<Self> {
        if let Some(payload) = line.strip_prefix(TEXT_PREFIX) {
            return serde_json::from_str::<String>(payload)
                .ok()
                .map(StreamPart::Text);
        }
        if let Some(payload) = line.strip_prefix(FINISH_PREFIX) {
            let finish: FinishPayload = serde_json::from_str(payload).ok()?;
            return (finish.kind == "finish").then_some(StreamPart::Finish {
                finish_reason: finish.finish_reason,
            });
        }
        None
    }

    pub fn is_finish(&self) -> bool {
        matches!(self, StreamPart::Finish { .. })
    }
}
