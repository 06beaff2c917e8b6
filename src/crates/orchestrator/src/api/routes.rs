//! API route definitions

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::{handlers, middleware};
use crate::runtime::AgentRuntime;

/// Build the complete API router
pub fn create_router(runtime: Arc<AgentRuntime>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/chat", post(handlers::chat))
        .route("/api/investigator/start", post(handlers::start))
        .route("/api/investigator/approve", post(handlers::approve))
        .route("/api/investigator/stream/:thread_id", get(handlers::stream))
        .layer(middleware::logging_layer())
        .layer(middleware::cors_layer())
        .with_state(runtime)
}
