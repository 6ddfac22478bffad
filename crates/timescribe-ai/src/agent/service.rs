//! Agent service trait

use async_trait::async_trait;

use crate::agent::types::{AgentContext, AgentReply, AgentSpec};
use crate::error::Result;

/// A hosted service that keeps stateful agents with their own memory.
#[async_trait]
pub trait AgentService: Send + Sync {
    /// Get provider name
    fn provider(&self) -> &str;

    /// Provision a new agent and return its opaque id.
    async fn create_agent(&self, spec: &AgentSpec) -> Result<String>;

    /// Snapshot of the agent's context window: memory sections and recent turns.
    async fn retrieve_context(&self, agent_id: &str) -> Result<AgentContext>;

    /// Deliver one user message to the agent.
    async fn send_message(&self, agent_id: &str, content: &str) -> Result<AgentReply>;
}
