//! User to agent registry.
//!
//! Every user owns exactly one hosted memory agent. The registry looks the
//! mapping up in the mapping store and provisions a new agent on first use.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use timescribe_ai::{AgentService, AgentSpec, MemoryBlock};
use timescribe_traits::{AgentHandle, AgentMappingStore};

use crate::error::{JournalError, Result};

pub const DEFAULT_AGENT_MODEL: &str = "openai/gpt-4";
pub const DEFAULT_EMBEDDING_MODEL: &str = "openai/text-embedding-3-small";
pub const DEFAULT_PERSONA: &str =
    "You are a memory journal keeper, helping users track their thoughts and experiences.";

/// Settings used when provisioning a new agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDefaults {
    pub model: String,
    pub embedding: String,
    pub persona: String,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: DEFAULT_AGENT_MODEL.to_string(),
            embedding: DEFAULT_EMBEDDING_MODEL.to_string(),
            persona: DEFAULT_PERSONA.to_string(),
        }
    }
}

impl AgentDefaults {
    /// Creation spec for `user_id`'s agent.
    pub fn spec_for(&self, user_id: &str) -> AgentSpec {
        AgentSpec {
            model: self.model.clone(),
            embedding: self.embedding.clone(),
            memory_blocks: vec![
                MemoryBlock::new("human", format!("User name: {}", user_id)),
                MemoryBlock::new("persona", self.persona.clone()),
            ],
        }
    }
}

pub struct AgentRegistry {
    mappings: Arc<dyn AgentMappingStore>,
    agents: Arc<dyn AgentService>,
    defaults: AgentDefaults,
    // Serializes first visits of one user within this process.
    user_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AgentRegistry {
    pub fn new(
        mappings: Arc<dyn AgentMappingStore>,
        agents: Arc<dyn AgentService>,
        defaults: AgentDefaults,
    ) -> Self {
        Self {
            mappings,
            agents,
            defaults,
            user_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.user_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Return the user's agent id, creating and recording an agent if the
    /// user has none yet.
    pub async fn get_or_create_agent(&self, user_id: &str) -> Result<String> {
        if let Some(handle) = self.find(user_id).await? {
            return Ok(handle.agent_id);
        }

        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        // Another task may have finished provisioning while we waited.
        if let Some(handle) = self.find(user_id).await? {
            return Ok(handle.agent_id);
        }

        let spec = self.defaults.spec_for(user_id);
        let agent_id = self.agents.create_agent(&spec).await.map_err(|e| {
            warn!(user_id, error = %e, "Agent provisioning failed");
            JournalError::AgentCreation(e.to_string())
        })?;

        let handle = AgentHandle::new(user_id, agent_id.clone());
        match self.mappings.insert_agent(&handle).await {
            Ok(()) => {
                info!(user_id, agent_id = %agent_id, "Created journal agent");
                Ok(agent_id)
            }
            Err(e) if e.is_conflict() => {
                // A different process recorded a mapping first; its agent wins.
                let stored = self.find(user_id).await?.ok_or_else(|| {
                    JournalError::AgentCreation(format!(
                        "mapping for {} conflicted but could not be read back",
                        user_id
                    ))
                })?;
                warn!(
                    user_id,
                    orphaned_agent_id = %agent_id,
                    agent_id = %stored.agent_id,
                    "Agent mapping already existed, discarding newly created agent"
                );
                Ok(stored.agent_id)
            }
            Err(e) => {
                warn!(
                    user_id,
                    orphaned_agent_id = %agent_id,
                    error = %e,
                    "Failed to record agent mapping"
                );
                Err(JournalError::AgentCreation(e.to_string()))
            }
        }
    }

    async fn find(&self, user_id: &str) -> Result<Option<AgentHandle>> {
        let handle = self.mappings.find_agent(user_id).await.map_err(|e| {
            JournalError::AgentCreation(format!("agent lookup failed: {}", e))
        })?;
        if let Some(handle) = &handle {
            debug!(user_id, agent_id = %handle.agent_id, "Found existing agent");
        }
        Ok(handle)
    }
}
