//! In-process scripted client for tests and offline runs.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{CompletionClient, CompletionRequest, LlmError};

type Responder = dyn Fn(&CompletionRequest, usize) -> Result<String, LlmError> + Send + Sync;

/// Client whose replies come from a closure instead of a network call.
///
/// Every request is recorded so tests can assert on call counts and prompt
/// contents.
pub struct ScriptedClient {
    responder: Box<Responder>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    /// Reply using `f(request, call_index)`.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&CompletionRequest, usize) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(f),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Reply with the same text to every request.
    pub fn always(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::from_fn(move |_, _| Ok(text.clone()))
    }

    /// Reply with each entry in order; further calls fail with `Exhausted`.
    pub fn sequence<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let replies: Vec<String> = replies.into_iter().map(Into::into).collect();
        Self::from_fn(move |_, index| {
            replies
                .get(index)
                .cloned()
                .ok_or(LlmError::Exhausted(index))
        })
    }

    /// Fail every request with an API error.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::from_fn(move |_, _| {
            Err(LlmError::Api {
                provider: "scripted",
                status: Some(503),
                message: message.clone(),
            })
        })
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Snapshot of recorded requests.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    fn provider(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len() - 1
        };
        (self.responder)(&request, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequence_then_exhausted() {
        let client = ScriptedClient::sequence(["one", "two"]);
        assert_eq!(client.complete(CompletionRequest::new("a")).await.unwrap(), "one");
        assert_eq!(client.complete(CompletionRequest::new("b")).await.unwrap(), "two");
        assert!(matches!(
            client.complete(CompletionRequest::new("c")).await,
            Err(LlmError::Exhausted(2))
        ));
        assert_eq!(client.calls(), 3);
        assert_eq!(client.requests()[1].prompt, "b");
    }

    #[tokio::test]
    async fn test_failing_client() {
        let client = ScriptedClient::failing("overloaded");
        let err = client.complete(CompletionRequest::new("x")).await.unwrap_err();
        assert!(err.to_string().contains("overloaded"));
    }
}
