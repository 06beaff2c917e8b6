//! Remote completion services.

pub mod openai;

pub use openai::OpenAiCompatClient;
