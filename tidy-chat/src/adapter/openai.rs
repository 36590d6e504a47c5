//! OpenAI-compatible chat-completions provider.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tracing::{debug, warn};

use crate::domain::ChatError;
use crate::services::{ByteStream, CompletionProvider, CompletionRequest};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Streams completions from `{base_url}/chat/completions`.
///
/// The secret is looked up in the environment on every call, so a key
/// rotated in the environment takes effect without a restart.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key_env: String,
}

impl OpenAiProvider {
    pub fn new(base_url: impl Into<String>, api_key_env: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, api_key_env)
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key_env: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key_env: api_key_env.into(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub fn api_key_env(&self) -> &str {
        &self.api_key_env
    }

    fn api_key(&self) -> Result<String, ChatError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ChatError::MissingApiKey(self.api_key_env.clone()))
    }
}

impl Default for OpenAiProvider {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_API_KEY_ENV)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn stream_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<ByteStream, ChatError> {
        let api_key = self.api_key()?;
        let url = self.endpoint();
        debug!(%url, model = %request.model, "opening upstream stream");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %body, "upstream provider rejected completion request");
            return Err(ChatError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ChatError::Transport(e.to_string())))
            .boxed())
    }
}
