//! In-memory agent service for pipeline and route tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{Duration, sleep};

use crate::agent::service::AgentService;
use crate::agent::types::{AgentContext, AgentReply, AgentSpec, ConversationTurn};
use crate::error::{AiError, Result};

#[derive(Debug, Default)]
struct MockAgentState {
    created: Vec<(String, AgentSpec)>,
    contexts: HashMap<String, AgentContext>,
    delivered: Vec<(String, String)>,
}

/// Agent service double that keeps agents in memory.
///
/// Delivered messages are appended to the agent's conversation, so a later
/// `retrieve_context` sees them. Each operation can be switched to fail.
#[derive(Debug, Clone, Default)]
pub struct MockAgentService {
    state: Arc<Mutex<MockAgentState>>,
    next_id: Arc<AtomicU64>,
    fail_create: Arc<AtomicBool>,
    fail_context: Arc<AtomicBool>,
    fail_message: Arc<AtomicBool>,
    create_delay_ms: Arc<AtomicU64>,
}

impl MockAgentService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_context(&self, fail: bool) {
        self.fail_context.store(fail, Ordering::SeqCst);
    }

    pub fn fail_message(&self, fail: bool) {
        self.fail_message.store(fail, Ordering::SeqCst);
    }

    /// Delay agent creation, widening the window for concurrent first visits.
    pub fn with_create_delay(self, delay_ms: u64) -> Self {
        self.create_delay_ms.store(delay_ms, Ordering::SeqCst);
        self
    }

    /// Replace the context reported for `agent_id`.
    pub fn set_context(&self, agent_id: &str, context: AgentContext) {
        self.state
            .lock()
            .contexts
            .insert(agent_id.to_string(), context);
    }

    /// Agents created so far as (agent_id, spec), oldest first.
    pub fn created_agents(&self) -> Vec<(String, AgentSpec)> {
        self.state.lock().created.clone()
    }

    /// Messages delivered so far as (agent_id, content), oldest first.
    pub fn delivered_messages(&self) -> Vec<(String, String)> {
        self.state.lock().delivered.clone()
    }
}

#[async_trait]
impl AgentService for MockAgentService {
    fn provider(&self) -> &str {
        "mock"
    }

    async fn create_agent(&self, spec: &AgentSpec) -> Result<String> {
        let delay = self.create_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AiError::Agent("mock agent creation failure".to_string()));
        }

        let agent_id = format!("agent-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut state = self.state.lock();
        state.created.push((agent_id.clone(), spec.clone()));
        state
            .contexts
            .insert(agent_id.clone(), AgentContext::default());
        Ok(agent_id)
    }

    async fn retrieve_context(&self, agent_id: &str) -> Result<AgentContext> {
        if self.fail_context.load(Ordering::SeqCst) {
            return Err(AiError::Agent("mock context failure".to_string()));
        }
        self.state
            .lock()
            .contexts
            .get(agent_id)
            .cloned()
            .ok_or_else(|| AiError::Agent(format!("unknown agent {}", agent_id)))
    }

    async fn send_message(&self, agent_id: &str, content: &str) -> Result<AgentReply> {
        if self.fail_message.load(Ordering::SeqCst) {
            return Err(AiError::Agent("mock transport failure".to_string()));
        }

        let mut state = self.state.lock();
        let context = state
            .contexts
            .get_mut(agent_id)
            .ok_or_else(|| AiError::Agent(format!("unknown agent {}", agent_id)))?;
        context.messages.push(ConversationTurn::user(content));
        context.messages.push(ConversationTurn::assistant("Noted."));
        state
            .delivered
            .push((agent_id.to_string(), content.to_string()));

        Ok(AgentReply {
            message_count: 1,
            assistant_text: Some("Noted.".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> AgentSpec {
        AgentSpec {
            model: "mock-model".to_string(),
            embedding: "mock-embedding".to_string(),
            memory_blocks: Vec::new(),
        }
    }

    #[tokio::test]
    async fn mock_service_tracks_conversation() {
        let service = MockAgentService::new();
        let agent_id = service.create_agent(&spec()).await.unwrap();
        assert_eq!(agent_id, "agent-1");

        service.send_message(&agent_id, "ran 5k").await.unwrap();
        let context = service.retrieve_context(&agent_id).await.unwrap();
        assert_eq!(context.messages[0], ConversationTurn::user("ran 5k"));
        assert_eq!(service.delivered_messages().len(), 1);
    }

    #[tokio::test]
    async fn mock_service_failure_switches() {
        let service = MockAgentService::new();
        service.fail_create(true);
        assert!(service.create_agent(&spec()).await.is_err());

        service.fail_create(false);
        let agent_id = service.create_agent(&spec()).await.unwrap();
        service.fail_context(true);
        service.fail_message(true);
        assert!(service.retrieve_context(&agent_id).await.is_err());
        assert!(service.send_message(&agent_id, "hi").await.is_err());
    }
}
