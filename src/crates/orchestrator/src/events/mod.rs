//! Client event protocol
//!
//! [`Translator`] turns raw [`ExecutionEvent`](langgraph_core::ExecutionEvent)s
//! into the small [`ClientEvent`] vocabulary clients consume, and
//! [`EventHub`] buffers one run's client events so any number of subscribers
//! can replay them.

pub mod hub;
pub mod translator;

pub use hub::EventHub;
pub use translator::{ClientEvent, Profile, Translator};
