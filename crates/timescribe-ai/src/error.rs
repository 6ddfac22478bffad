//! Error types for the AI clients

use thiserror::Error;

/// AI client error types
#[derive(Error, Debug)]
pub enum AiError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("{provider} API error (HTTP {status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AiError {
    /// HTTP status reported by the upstream service, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AiError::Api { status, .. } => Some(*status),
            AiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for AI operations
pub type Result<T> = std::result::Result<T, AiError>;
