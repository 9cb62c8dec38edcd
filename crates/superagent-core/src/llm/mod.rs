//! Text-completion clients.
//!
//! The pipeline only needs "prompt in, text out", so backends implement the
//! narrow [`CompletionClient`] trait. Two HTTP backends ship here: Gemini
//! (the quality provider) and Groq (the fast provider). Which one runs is a
//! configuration decision made by [`select_client`].

mod gemini;
mod groq;
mod scripted;
mod selector;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

pub use gemini::GeminiClient;
pub use groq::{parse_sse_line, GroqClient, SseEvent};
pub use scripted::ScriptedClient;
pub use selector::select_client;

/// Errors from LLM backends.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("{provider} request failed (status {status:?}): {message}")]
    Api {
        provider: &'static str,
        status: Option<u16>,
        message: String,
    },

    #[error("{provider} request timed out after {seconds}s")]
    Timeout { provider: &'static str, seconds: u64 },

    #[error("{provider} returned an empty completion")]
    EmptyResponse { provider: &'static str },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("no LLM provider configured: set GEMINI_API_KEY or GROQ_API_KEY")]
    NotConfigured,

    #[error("scripted client exhausted after {0} call(s)")]
    Exhausted(usize),
}

/// A single completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Stream of completion text chunks.
pub type CompletionStream = BoxStream<'static, Result<String, LlmError>>;

/// Pluggable text-completion backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Short provider name for logs.
    fn provider(&self) -> &'static str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Complete a prompt, returning the full text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;

    /// Complete a prompt as a stream of text chunks.
    ///
    /// Backends without native streaming yield the full completion as a
    /// single chunk.
    async fn complete_stream(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionStream, LlmError> {
        let text = self.complete(request).await?;
        Ok(futures::stream::once(async move { Ok::<_, LlmError>(text) }).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[test]
    fn test_request_builder() {
        let req = CompletionRequest::new("hello")
            .with_system("be terse")
            .with_temperature(0.2)
            .with_max_tokens(64);
        assert_eq!(req.prompt, "hello");
        assert_eq!(req.system.as_deref(), Some("be terse"));
        assert_eq!(req.temperature, Some(0.2));
        assert_eq!(req.max_tokens, Some(64));
    }

    #[tokio::test]
    async fn test_default_stream_is_single_chunk() {
        let client = ScriptedClient::always("full text");
        let chunks: Vec<String> = client
            .complete_stream(CompletionRequest::new("x"))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks, vec!["full text".to_string()]);
    }
}
