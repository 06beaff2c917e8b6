//! API request handlers

pub mod chat;
pub mod health;
pub mod investigator;

pub use chat::chat;
pub use health::health;
pub use investigator::{approve, start, stream};
