//! LLM client trait and types

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Chat message role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// LLM completion response
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: Option<String>,
    pub finish_reason: FinishReason,
    pub usage: Option<TokenUsage>,
}

/// Reason for completion
#[derive(Debug, Clone, PartialEq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Error,
}

impl FinishReason {
    pub(crate) fn from_wire(reason: &str) -> Self {
        match reason {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::MaxTokens,
            _ => FinishReason::Error,
        }
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// LLM completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
}

impl CompletionRequest {
    /// Create a new completion request
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
            top_p: None,
        }
    }

    /// Request with sampling disabled (temperature 0).
    pub fn deterministic(messages: Vec<Message>) -> Self {
        Self::new(messages).with_temperature(0.0)
    }

    /// Set temperature
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Set nucleus sampling
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }
}

/// One increment of a streamed completion
#[derive(Debug, Clone, PartialEq)]
pub struct StreamChunk {
    pub text: String,
    pub finish_reason: Option<FinishReason>,
}

impl StreamChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: None,
        }
    }

    pub fn final_chunk(reason: FinishReason) -> Self {
        Self {
            text: String::new(),
            finish_reason: Some(reason),
        }
    }
}

/// Stream of completion chunks
pub type StreamResult = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// LLM client trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Get provider name
    fn provider(&self) -> &str;

    /// Get model name
    fn model(&self) -> &str;

    /// Complete a chat request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Complete a chat request, yielding text deltas as they arrive
    fn complete_stream(&self, request: CompletionRequest) -> StreamResult;
}
