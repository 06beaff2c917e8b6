//! Chat endpoint
//!
//! The run is spawned before the response starts; the body replays the
//! thread's event hub as newline-delimited JSON, one `ClientEvent` per line.
//! A client hanging up only drops its subscription.

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use std::sync::Arc;

use crate::api::{error::ApiResult, models::ChatRequest};
use crate::runtime::{AgentRuntime, ChatInput};

pub const NDJSON: &str = "application/x-ndjson";

/// Handler for POST /api/chat
pub async fn chat(
    State(runtime): State<Arc<AgentRuntime>>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Response> {
    let mode = request.chat_mode();
    let hub = runtime.chat(ChatInput {
        thread_id: request.thread_id,
        messages: request.messages,
        model: request.model,
        thinking: request.thinking,
        mode: Some(mode),
    })?;

    let lines = hub.subscribe(0).map(|event| {
        serde_json::to_string(&event).map(|mut line| {
            line.push('\n');
            line
        })
    });

    Ok(([(header::CONTENT_TYPE, NDJSON)], Body::from_stream(lines)).into_response())
}
