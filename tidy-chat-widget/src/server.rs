//! Assembles the chat route with the OpenAI provider and the business persona.

use std::any::Any;
use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tidy_chat::{ChatRouteState, CompletionProvider, OpenAiProvider, StreamReformatter, chat_router};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer};
use tracing::{error, info, warn};

use crate::config::WidgetConfig;
use crate::prompt::system_prompt;

pub struct WidgetServer {
    config: WidgetConfig,
    reformatter: StreamReformatter,
}

impl WidgetServer {
    pub fn from_config(config: WidgetConfig) -> Self {
        let provider = OpenAiProvider::new(&config.upstream_base_url, &config.api_key_env);
        Self::with_provider(config, Arc::new(provider))
    }

    /// Build the server around any provider; used to run against fakes.
    pub fn with_provider(config: WidgetConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        let reformatter = StreamReformatter::new(
            provider,
            system_prompt(&config.business_name),
            config.model.clone(),
        );
        Self {
            config,
            reformatter,
        }
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    /// The full application: chat routes, permissive CORS so the widget can be
    /// embedded on any site, and a JSON 500 for handler panics.
    pub fn router(&self) -> Router {
        let state = ChatRouteState::new(self.reformatter.clone(), self.config.max_turn_duration());
        chat_router(state)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(CorsLayer::permissive())
    }

    pub async fn start(&self) -> Result<(), std::io::Error> {
        if std::env::var(&self.config.api_key_env).is_err() {
            warn!(
                variable = %self.config.api_key_env,
                "provider API key is not set; chat requests will fail until it is"
            );
        }

        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(
            %addr,
            model = %self.config.model,
            upstream = %self.config.upstream_base_url,
            "chat widget server listening"
        );

        axum::serve(listener, self.router()).await
    }
}

fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
    error!("chat handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Failed to process chat request" })),
    )
        .into_response()
}
