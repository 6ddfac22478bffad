//! Entry ingestion: stamp, persist, condense, relay.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use timescribe_ai::AgentService;
use timescribe_traits::{EntryStore, MemoryEntry};

use crate::error::{JournalError, Result};
use crate::journal::registry::AgentRegistry;
use crate::journal::summarizer::Summarizer;

/// Source of "today" for stamping entries.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Process-local calendar date.
pub fn local_clock() -> Clock {
    Arc::new(|| Local::now().date_naive())
}

/// Acknowledgement returned once an entry is persisted and condensed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestAck {
    pub response: String,
    pub timestamp: NaiveDate,
}

impl IngestAck {
    fn logged(date: NaiveDate) -> Self {
        Self {
            response: format!("logged entry for {}", date),
            timestamp: date,
        }
    }
}

pub struct IngestionPipeline {
    entries: Arc<dyn EntryStore>,
    agents: Arc<dyn AgentService>,
    registry: Arc<AgentRegistry>,
    summarizer: Summarizer,
    clock: Clock,
    relays: TaskTracker,
}

impl IngestionPipeline {
    pub fn new(
        entries: Arc<dyn EntryStore>,
        agents: Arc<dyn AgentService>,
        registry: Arc<AgentRegistry>,
        summarizer: Summarizer,
    ) -> Self {
        Self {
            entries,
            agents,
            registry,
            summarizer,
            clock: local_clock(),
            relays: TaskTracker::new(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Tracker holding the in-flight relay tasks.
    pub fn relays(&self) -> &TaskTracker {
        &self.relays
    }

    /// Log one message for `user_id`.
    ///
    /// The entry is persisted before anything else happens; a storage
    /// failure aborts with no condensation and no relay. The condensed text
    /// is handed to the user's agent on a detached task whose outcome is
    /// only logged.
    pub async fn ingest(&self, user_id: &str, agent_id: &str, message: &str) -> Result<IngestAck> {
        if message.trim().is_empty() {
            return Err(JournalError::validation("Message must not be empty"));
        }

        let today = (self.clock)();
        let stamped = format!("{}: {}", today, message);

        self.entries
            .append(&MemoryEntry::new(user_id, message, today))
            .await
            .inspect_err(|e| error!(user_id, error = %e, "Failed to persist journal entry"))?;
        debug!(user_id, date = %today, "Journal entry persisted");

        let condensed = self.summarizer.condense(&stamped).await.inspect_err(|e| {
            // The entry stays stored; the agent will not hear about it.
            warn!(user_id, date = %today, error = %e, "Condensation failed after entry was persisted");
        })?;

        self.spawn_relay(user_id, agent_id, condensed);

        Ok(IngestAck::logged(today))
    }

    /// Resolve the user's agent, then ingest.
    pub async fn ingest_for_user(&self, user_id: &str, message: &str) -> Result<IngestAck> {
        if message.trim().is_empty() {
            return Err(JournalError::validation("Message must not be empty"));
        }
        let agent_id = self.registry.get_or_create_agent(user_id).await?;
        self.ingest(user_id, &agent_id, message).await
    }

    fn spawn_relay(&self, user_id: &str, agent_id: &str, condensed: String) {
        let agents = self.agents.clone();
        let user_id = user_id.to_string();
        let agent_id = agent_id.to_string();

        self.relays.spawn(async move {
            match agents.send_message(&agent_id, &condensed).await {
                Ok(reply) => info!(
                    user_id = %user_id,
                    agent_id = %agent_id,
                    messages = reply.message_count,
                    reply = reply.assistant_text.as_deref().unwrap_or(""),
                    "Relayed entry to agent"
                ),
                Err(e) => warn!(
                    user_id = %user_id,
                    agent_id = %agent_id,
                    error = %e,
                    "Relay to agent failed"
                ),
            }
        });
    }
}
