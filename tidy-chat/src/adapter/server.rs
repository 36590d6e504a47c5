//! The widget-facing chat route.

use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::StreamExt;
use serde_json::json;
use tracing::{error, info, warn};

use crate::domain::{CONTENT_TYPE, ChatError, ChatRequest, DATA_STREAM_HEADER, DATA_STREAM_VERSION};
use crate::services::StreamReformatter;

/// Shared state for the chat routes.
#[derive(Clone)]
pub struct ChatRouteState {
    pub reformatter: StreamReformatter,
    /// Ceiling on a whole turn, from request to last byte.
    pub max_turn_duration: Duration,
}

impl ChatRouteState {
    pub fn new(reformatter: StreamReformatter, max_turn_duration: Duration) -> Self {
        Self {
            reformatter,
            max_turn_duration,
        }
    }
}

/// `POST /api/chat` and `GET /health`.
pub fn chat_router(state: ChatRouteState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn chat(
    State(state): State<ChatRouteState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ChatError> {
    let Json(request) = payload.map_err(|e| ChatError::InvalidRequest(e.body_text()))?;
    info!(messages = request.messages.len(), "chat turn started");

    let limit = state.max_turn_duration;
    let deadline = tokio::time::Instant::now() + limit;

    let reply = tokio::time::timeout_at(deadline, state.reformatter.respond(request))
        .await
        .map_err(|_| ChatError::Timeout(limit.as_secs()))??;

    let cutoff = async move {
        tokio::time::sleep_until(deadline).await;
        warn!(
            limit_secs = limit.as_secs(),
            "turn exceeded maximum duration; closing reply stream"
        );
    };
    let body = Body::from_stream(reply.take_until(cutoff));

    Ok((
        [
            (header::CONTENT_TYPE, CONTENT_TYPE),
            (HeaderName::from_static(DATA_STREAM_HEADER), DATA_STREAM_VERSION),
        ],
        body,
    )
        .into_response())
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        error!("chat request failed: {}", self);
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
