//! Groq chat-completions provider (OpenAI-compatible wire format)

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AiError, Result};
use crate::http_client::{build_http_client, response_to_error};
use crate::llm::client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, StreamChunk, StreamResult,
    TokenUsage,
};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

/// Groq client
#[derive(Clone)]
pub struct GroqClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GroqClient {
    /// Create a new Groq client
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set custom base URL (for API-compatible services)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn request_body<'a>(&'a self, request: &'a CompletionRequest, stream: bool) -> GroqRequest<'a> {
        GroqRequest {
            model: &self.model,
            messages: request
                .messages
                .iter()
                .map(|m| GroqMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: request.temperature,
            max_completion_tokens: request.max_tokens,
            top_p: request.top_p,
            stream,
        }
    }
}

#[derive(Serialize)]
struct GroqRequest<'a> {
    model: &'a str,
    messages: Vec<GroqMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    stream: bool,
}

#[derive(Serialize)]
struct GroqMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct GroqResponse {
    choices: Vec<GroqChoice>,
    usage: Option<GroqUsage>,
}

#[derive(Deserialize)]
struct GroqChoice {
    message: GroqResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GroqResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GroqUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// Streaming types

#[derive(Deserialize, Debug)]
struct GroqStreamResponse {
    choices: Vec<GroqStreamChoice>,
}

#[derive(Deserialize, Debug)]
struct GroqStreamChoice {
    delta: GroqStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GroqStreamDelta {
    content: Option<String>,
}

/// Remove every complete SSE event from `buffer` and return its `data:` payloads.
///
/// The buffer holds raw bytes so a multibyte character split across network
/// chunks is only decoded once its event is complete.
fn drain_sse_data(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut payloads = Vec::new();
    while let Some(pos) = buffer.windows(2).position(|w| w == b"\n\n") {
        let event: Vec<u8> = buffer.drain(..pos + 2).collect();
        let event = String::from_utf8_lossy(&event);
        for line in event.lines() {
            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.trim().to_string());
            }
        }
    }
    payloads
}

/// Translate one SSE payload into stream chunks.
fn chunks_from_payload(data: &str) -> Vec<StreamChunk> {
    if data.is_empty() || data == "[DONE]" {
        return Vec::new();
    }

    let parsed: GroqStreamResponse = match serde_json::from_str(data) {
        Ok(p) => p,
        Err(_) => return Vec::new(),
    };

    let mut chunks = Vec::new();
    for choice in parsed.choices {
        if let Some(content) = choice.delta.content
            && !content.is_empty()
        {
            chunks.push(StreamChunk::text(content));
        }
        if let Some(reason) = choice.finish_reason {
            chunks.push(StreamChunk::final_chunk(FinishReason::from_wire(&reason)));
        }
    }
    chunks
}

#[async_trait]
impl LlmClient for GroqClient {
    fn provider(&self) -> &str {
        "groq"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = self.request_body(&request, false);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(response_to_error(response, "Groq").await);
        }

        let data: GroqResponse = response.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AiError::Llm("No response from Groq".to_string()))?;

        let finish_reason = choice
            .finish_reason
            .as_deref()
            .map(FinishReason::from_wire)
            .unwrap_or(FinishReason::Stop);

        let usage = data.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        tracing::debug!(
            model = %self.model,
            total_tokens = usage.as_ref().map(|u| u.total_tokens),
            "Groq completion finished"
        );

        Ok(CompletionResponse {
            content: choice.message.content,
            finish_reason,
            usage,
        })
    }

    fn complete_stream(&self, request: CompletionRequest) -> StreamResult {
        let this = self.clone();

        Box::pin(async_stream::stream! {
            let body = this.request_body(&request, true);

            let response = match this
                .client
                .post(format!("{}/chat/completions", this.base_url))
                .bearer_auth(&this.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(AiError::Llm(format!("Request failed: {}", e)));
                    return;
                }
            };

            if !response.status().is_success() {
                yield Err(response_to_error(response, "Groq").await);
                return;
            }

            let mut byte_stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(AiError::Llm(format!("Stream error: {}", e)));
                        return;
                    }
                };

                buffer.extend_from_slice(&chunk);

                for data in drain_sse_data(&mut buffer) {
                    for chunk in chunks_from_payload(&data) {
                        yield Ok(chunk);
                    }
                }
            }

            // The last event may lack its trailing blank line.
            buffer.extend_from_slice(b"\n\n");
            for data in drain_sse_data(&mut buffer) {
                for chunk in chunks_from_payload(&data) {
                    yield Ok(chunk);
                }
            }
        })
    }
}
