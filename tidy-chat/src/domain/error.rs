//! Error types for the reformatting side of the widget.

use thiserror::Error;

/// Errors raised while turning a chat request into a reformatted stream.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The provider answered with a non-success status.
    #[error("upstream provider returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The provider secret is not present in the process environment.
    #[error("environment variable {0} is not set")]
    MissingApiKey(String),

    /// The connection to the provider failed or broke mid-stream.
    #[error("transport error: {0}")]
    Transport(String),

    /// The inbound request body could not be read.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The turn exceeded the host's maximum duration.
    #[error("completion timed out after {0} seconds")]
    Timeout(u64),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChatError {
    /// HTTP status this error maps to when returned to the widget.
    pub fn status_code(&self) -> u16 {
        match self {
            ChatError::InvalidRequest(_) => 400,
            ChatError::Upstream { .. } | ChatError::Transport(_) => 502,
            ChatError::Timeout(_) => 504,
            ChatError::MissingApiKey(_) | ChatError::Json(_) => 500,
        }
    }

    /// Message safe to show to the widget. Provider bodies and deployment
    /// details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ChatError::InvalidRequest(reason) => format!("Invalid request: {reason}"),
            ChatError::Upstream { status, .. } => {
                format!("The assistant is unavailable (upstream status {status})")
            }
            ChatError::Transport(_) => "The assistant could not be reached".to_string(),
            ChatError::Timeout(_) => "The assistant took too long to answer".to_string(),
            ChatError::MissingApiKey(_) | ChatError::Json(_) => {
                "Failed to process chat request".to_string()
            }
        }
    }
}
