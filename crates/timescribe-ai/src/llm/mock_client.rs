//! Deterministic mock LLM client for pipeline and route tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{AiError, Result};

use super::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Role, StreamChunk,
    StreamResult, TokenUsage,
};

/// Deterministic step for scripted mock completions.
#[derive(Debug, Clone)]
pub enum MockStepKind {
    /// Return a plain assistant message.
    Text(String),
    /// Return an LLM error.
    Error(String),
}

/// Scripted completion step.
#[derive(Debug, Clone)]
pub struct MockStep {
    pub kind: MockStepKind,
}

impl MockStep {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: MockStepKind::Text(content.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: MockStepKind::Error(message.into()),
        }
    }
}

/// A deterministic mock LLM client driven by scripted steps.
///
/// Every request is recorded so tests can assert on prompts and sampling
/// parameters. When the script runs out the client echoes the last user
/// message.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    model: String,
    script: Arc<Mutex<VecDeque<MockStep>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockLlmClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn from_steps(model: impl Into<String>, steps: Vec<MockStep>) -> Self {
        let client = Self::new(model);
        client.script.lock().extend(steps);
        client
    }

    pub fn push_step(&self, step: MockStep) {
        self.script.lock().push_back(step);
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_step(&self) -> Option<MockStep> {
        self.script.lock().pop_front()
    }

    fn usage_for(content_len: usize) -> TokenUsage {
        let completion_tokens = content_len as u32;
        TokenUsage {
            prompt_tokens: 1,
            completion_tokens,
            total_tokens: 1 + completion_tokens,
        }
    }

    fn fallback_response(request: &CompletionRequest) -> CompletionResponse {
        let text = request
            .messages
            .iter()
            .rev()
            .find(|msg| msg.role == Role::User)
            .map(|msg| format!("mock-echo: {}", msg.content))
            .unwrap_or_else(|| "mock-ok".to_string());

        CompletionResponse {
            usage: Some(Self::usage_for(text.len())),
            content: Some(text),
            finish_reason: FinishReason::Stop,
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().push(request.clone());

        let Some(step) = self.next_step() else {
            return Ok(Self::fallback_response(&request));
        };

        match step.kind {
            MockStepKind::Text(content) => Ok(CompletionResponse {
                usage: Some(Self::usage_for(content.len())),
                content: Some(content),
                finish_reason: FinishReason::Stop,
            }),
            MockStepKind::Error(message) => Err(AiError::Llm(message)),
        }
    }

    fn complete_stream(&self, request: CompletionRequest) -> StreamResult {
        let client = self.clone();
        Box::pin(try_stream! {
            let response = client.complete(request).await?;

            if let Some(content) = response.content {
                // Emit word by word to exercise incremental consumers.
                for word in content.split_inclusive(' ') {
                    yield StreamChunk::text(word);
                }
            }

            yield StreamChunk::final_chunk(response.finish_reason);
        })
    }
}
