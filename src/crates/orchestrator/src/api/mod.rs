//! HTTP service
//!
//! - `GET  /health`
//! - `POST /api/chat` - brew run, streamed as NDJSON
//! - `POST /api/investigator/start` - plan and pause for review
//! - `POST /api/investigator/approve` - feedback or approval, resumes in the background
//! - `GET  /api/investigator/stream/:thread_id` - server-sent events of the latest run

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use routes::create_router;
