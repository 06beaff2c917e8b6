//! Plan / review / execute endpoints of the investigator

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{ApproveRequest, ApproveResponse, StartRequest, StartResponse};
use crate::events::ClientEvent;
use crate::runtime::AgentRuntime;

/// Handler for POST /api/investigator/start
///
/// Plans the research and returns once the thread is paused for review.
pub async fn start(
    State(runtime): State<Arc<AgentRuntime>>,
    Json(request): Json<StartRequest>,
) -> ApiResult<Json<StartResponse>> {
    let investigation = runtime
        .start_investigation(
            &request.topic,
            request.thread_id,
            request.model.as_deref(),
            request.thinking,
        )
        .await?;

    Ok(Json(StartResponse {
        thread_id: investigation.thread_id,
        plan: investigation.plan,
    }))
}

/// Handler for POST /api/investigator/approve
pub async fn approve(
    State(runtime): State<Arc<AgentRuntime>>,
    Json(request): Json<ApproveRequest>,
) -> ApiResult<Json<ApproveResponse>> {
    if request.thread_id.trim().is_empty() {
        return Err(ApiError::BadRequest("thread_id must not be empty".into()));
    }
    runtime.approve(&request.thread_id, &request.feedback).await?;

    Ok(Json(ApproveResponse {
        status: "resumed".to_string(),
        thread_id: request.thread_id,
    }))
}

/// Handler for GET /api/investigator/stream/:thread_id
pub async fn stream(
    State(runtime): State<Arc<AgentRuntime>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let hub = runtime
        .hub(&thread_id)
        .ok_or_else(|| ApiError::NotFound(format!("no run for thread '{thread_id}'")))?;

    let events = hub.subscribe(0).map(|event| Ok(sse_event(&event)));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn sse_event(event: &ClientEvent) -> Event {
    Event::default()
        .event(event.kind())
        .json_data(event)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}
