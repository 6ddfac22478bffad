//! Timescribe AI - Clients for the hosted services behind the journal.
//!
//! This crate provides:
//! - Chat-completion client (Groq, OpenAI-compatible), single-shot and streamed
//! - Agent-memory service client (Letta): create, context, message
//! - Speech transcription client
//! - Scripted mock clients for tests

pub mod agent;
pub mod error;
mod http_client;
pub mod llm;
pub mod transcribe;

// Re-export commonly used types
pub use agent::{
    AgentContext, AgentReply, AgentService, AgentSpec, ConversationTurn, LettaClient,
    MemoryBlock, MockAgentService, TurnRole,
};
pub use error::{AiError, Result};
pub use llm::{
    CompletionRequest, CompletionResponse, FinishReason, GroqClient, LlmClient, Message,
    MockLlmClient, MockStep, Role, StreamChunk, StreamResult, TokenUsage,
};
pub use transcribe::TranscriptionClient;
