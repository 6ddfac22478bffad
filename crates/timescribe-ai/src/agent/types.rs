//! Agent service data types

use serde::{Deserialize, Serialize};

/// Labeled seed fact given to an agent at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBlock {
    pub label: String,
    pub value: String,
}

impl MemoryBlock {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Everything needed to provision an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub model: String,
    pub embedding: String,
    pub memory_blocks: Vec<MemoryBlock>,
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

/// One message from the agent's own history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// The agent's context window as reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentContext {
    pub core_memory: String,
    pub summary_memory: Option<String>,
    pub external_memory_summary: String,
    /// Oldest first.
    pub messages: Vec<ConversationTurn>,
}

/// Outcome of delivering a message to an agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentReply {
    /// Number of messages the agent produced in response.
    pub message_count: usize,
    /// Text the agent addressed back to the user, if any.
    pub assistant_text: Option<String>,
}
