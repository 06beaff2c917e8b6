//! Completion-service boundary for brewgraph.
//!
//! Everything the orchestrator knows about language models goes through
//! this crate:
//!
//! - [`Message`] / [`MessageContent`] and the total [`extract_text`] conversion
//! - [`ChatModel`], the async completion trait (`chat` + token `stream`)
//! - tool schemas ([`ToolSpec`], [`ToolCall`]) and structured output
//!   ([`ResponseFormat`], [`chat_structured`])
//! - [`ModelOptions`], the per-request model and reasoning pass-through
//! - [`OpenAiCompatClient`], an HTTP client for `/chat/completions`
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::{ChatModel, ChatRequest, Message, ModelOptions, OpenAiCompatClient, RemoteLlmConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RemoteLlmConfig::from_env(
//!         "OPENAI_API_KEY",
//!         "https://api.openai.com/v1",
//!         "gpt-4.1",
//!     )?;
//!     let client = OpenAiCompatClient::new(config)?;
//!
//!     let request = ChatRequest::new(vec![Message::user("Explain borrowing briefly")])
//!         .with_options(ModelOptions::for_model("gpt-5", true));
//!
//!     let response = client.chat(request).await?;
//!     println!("{}", response.text());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod messages;
pub mod remote;
pub mod request;
pub mod structured;
pub mod traits;

pub use config::{ModelOptions, RemoteLlmConfig};
pub use error::{LlmError, Result};
pub use messages::{extract_text, value_text, ContentBlock, Message, MessageContent, MessageRole};
pub use remote::OpenAiCompatClient;
pub use request::{ChatRequest, ChatResponse, ResponseFormat, ToolCall, ToolSpec, UsageMetadata};
pub use structured::{chat_structured, parse_structured, strip_code_fences};
pub use traits::{ChatModel, TokenStream};
