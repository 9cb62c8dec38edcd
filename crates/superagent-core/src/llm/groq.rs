//! Groq OpenAI-compatible chat backend (the fast provider).
//!
//! Streaming uses server-sent events: each `data:` line carries a chat
//! completion chunk, and `data: [DONE]` terminates the stream.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::gemini::truncate;
use super::{CompletionClient, CompletionRequest, CompletionStream, LlmError};
use crate::config::{LlmSettings, GROQ_BASE_URL};

const PROVIDER: &str = "groq";

/// Client for Groq's chat completions endpoint.
#[derive(Debug, Clone)]
pub struct GroqClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GroqClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: GROQ_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn from_settings(api_key: &str, settings: &LlmSettings) -> Self {
        Self::new(api_key, &settings.groq_model)
            .with_base_url(&settings.groq_base_url)
            .with_timeout(settings.timeout)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/openai/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest, stream: bool) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });
        ChatRequest {
            model: &self.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        }
    }

    async fn post(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response, LlmError> {
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: PROVIDER,
                status: Some(status.as_u16()),
                message: truncate(&message, 500),
            });
        }
        Ok(response)
    }

    async fn send(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let response = self.post(&self.body(request, false)).await?;
        let parsed: ChatResponse = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse { provider: PROVIDER });
        }
        Ok(text)
    }

    fn timed_out(&self) -> LlmError {
        LlmError::Timeout {
            provider: PROVIDER,
            seconds: self.timeout.as_secs(),
        }
    }
}

#[async_trait]
impl CompletionClient for GroqClient {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let start = std::time::Instant::now();
        match tokio::time::timeout(self.timeout, self.send(&request)).await {
            Ok(Ok(text)) => {
                debug!(
                    provider = PROVIDER,
                    model = %self.model,
                    chars = text.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "completion received"
                );
                Ok(text)
            }
            Ok(Err(err)) => {
                error!(provider = PROVIDER, error = %err, "completion failed");
                Err(err)
            }
            Err(_) => Err(self.timed_out()),
        }
    }

    async fn complete_stream(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionStream, LlmError> {
        let body = self.body(&request, true);
        let response = tokio::time::timeout(self.timeout, self.post(&body))
            .await
            .map_err(|_| self.timed_out())??;

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()))
            .boxed();

        let state = SseReader {
            body: bytes,
            buffer: Vec::new(),
            pending: VecDeque::new(),
            finished: false,
        };

        let stream = futures::stream::unfold(state, |mut state| async move {
            loop {
                if let Some(chunk) = state.pending.pop_front() {
                    return Some((Ok(chunk), state));
                }
                if state.finished {
                    return None;
                }
                match state.body.next().await {
                    Some(Ok(bytes)) => {
                        state.buffer.extend_from_slice(&bytes);
                        state.drain_lines();
                    }
                    Some(Err(err)) => {
                        state.finished = true;
                        return Some((Err(LlmError::Transport(err)), state));
                    }
                    None => {
                        state.finished = true;
                        let rest = std::mem::take(&mut state.buffer);
                        if !rest.is_empty() {
                            state.push_line(&String::from_utf8_lossy(&rest));
                        }
                    }
                }
            }
        });

        Ok(stream.boxed())
    }
}

/// One decoded server-sent-event line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A non-empty content delta.
    Delta(String),
    /// The `[DONE]` terminator.
    Done,
    /// Comments, keep-alives, role-only chunks and anything unparseable.
    Ignore,
}

/// Decode a single SSE line from an OpenAI-compatible chat stream.
pub fn parse_sse_line(line: &str) -> SseEvent {
    let Some(data) = line.trim().strip_prefix("data:") else {
        return SseEvent::Ignore;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseEvent::Done;
    }
    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map(SseEvent::Delta)
            .unwrap_or(SseEvent::Ignore),
        Err(_) => SseEvent::Ignore,
    }
}

struct SseReader {
    body: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    finished: bool,
}

impl SseReader {
    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.push_line(&String::from_utf8_lossy(&line));
            if self.finished {
                self.buffer.clear();
                break;
            }
        }
    }

    fn push_line(&mut self, line: &str) {
        match parse_sse_line(line) {
            SseEvent::Delta(text) => self.pending.push_back(text),
            SseEvent::Done => self.finished = true,
            SseEvent::Ignore => {}
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(parse_sse_line(line), SseEvent::Delta("Hel".into()));
    }

    #[test]
    fn test_parse_done() {
        assert_eq!(parse_sse_line("data: [DONE]\n"), SseEvent::Done);
    }

    #[test]
    fn test_parse_ignores_noise() {
        assert_eq!(parse_sse_line(": keep-alive"), SseEvent::Ignore);
        assert_eq!(parse_sse_line(""), SseEvent::Ignore);
        assert_eq!(parse_sse_line("data: not-json"), SseEvent::Ignore);
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            SseEvent::Ignore
        );
    }

    #[test]
    fn test_body_includes_system_first() {
        let client = GroqClient::new("k", "m");
        let request = CompletionRequest::new("do it").with_system("sys");
        let value = serde_json::to_value(client.body(&request, true)).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "do it");
        assert_eq!(value["stream"], true);
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn test_reader_splits_lines_across_chunks() {
        let mut reader = SseReader {
            body: futures::stream::empty().boxed(),
            buffer: Vec::new(),
            pending: VecDeque::new(),
            finished: false,
        };
        reader
            .buffer
            .extend_from_slice(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\ndata: {\"cho");
        reader.drain_lines();
        assert_eq!(reader.pending.len(), 1);
        reader
            .buffer
            .extend_from_slice(b"ices\":[{\"delta\":{\"content\":\"b\"}}]}\ndata: [DONE]\n");
        reader.drain_lines();
        assert_eq!(reader.pending, VecDeque::from(vec!["a".to_string(), "b".to_string()]));
        assert!(reader.finished);
    }
}
