//! Error taxonomy of the journal pipeline.

use thiserror::Error;
use timescribe_ai::AiError;
use timescribe_traits::StoreError;

#[derive(Error, Debug)]
pub enum JournalError {
    /// The caller sent something the journal cannot accept.
    #[error("{0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Agent creation failed: {0}")]
    AgentCreation(String),

    /// A hosted completion or agent call failed on the synchronous path.
    #[error("External service error: {0}")]
    ExternalService(#[from] AiError),
}

impl JournalError {
    pub fn validation(message: impl Into<String>) -> Self {
        JournalError::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, JournalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_is_bare() {
        assert_eq!(
            JournalError::validation("Message must not be empty").to_string(),
            "Message must not be empty"
        );
    }
}
