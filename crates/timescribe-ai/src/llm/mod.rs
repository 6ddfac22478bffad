//! LLM module - Chat-completion client abstraction

mod client;
pub mod groq;
mod mock_client;

pub use client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, Role, StreamChunk,
    StreamResult, TokenUsage,
};
pub use groq::GroqClient;
pub use mock_client::{MockLlmClient, MockStep, MockStepKind};
