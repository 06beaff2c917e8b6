//! The `ChatModel` trait

use crate::error::Result;
use crate::request::{ChatRequest, ChatResponse};
use async_trait::async_trait;
use futures::stream::{self, Stream};
use std::pin::Pin;

/// Stream of answer tokens
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A completion service.
///
/// Implementations must be shareable across threads; graph nodes hold them
/// behind `Arc<dyn ChatModel>`.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete `request` in one response
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Stream the answer text.
    ///
    /// The default yields the whole [`chat`](Self::chat) answer as a single token.
    async fn stream(&self, request: ChatRequest) -> Result<TokenStream> {
        let text = self.chat(request).await?.text();
        Ok(Box::pin(stream::once(async move { Ok(text) })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Message;
    use futures::StreamExt;

    struct Echo;

    #[async_trait]
    impl ChatModel for Echo {
        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
            let last = request.messages.last().map(Message::text).unwrap_or_default();
            Ok(ChatResponse::new(Message::assistant(format!("echo: {last}"))))
        }
    }

    #[tokio::test]
    async fn test_default_stream_yields_single_token() {
        let mut tokens = Echo
            .stream(ChatRequest::new(vec![Message::user("ping")]))
            .await
            .unwrap();
        assert_eq!(tokens.next().await.unwrap().unwrap(), "echo: ping");
        assert!(tokens.next().await.is_none());
    }
}
