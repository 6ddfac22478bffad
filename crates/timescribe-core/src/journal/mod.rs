//! The memory journal: ingestion, recall and summarization wired together.

pub mod assembler;
pub mod ingest;
pub mod registry;
pub mod summarizer;

use std::sync::Arc;

use tracing::{debug, info};

use timescribe_ai::{AgentService, CompletionRequest, LlmClient, Message, StreamResult};
use timescribe_traits::{AgentMappingStore, DateRange, EntryStore};

use crate::error::{JournalError, Result};

pub use assembler::{ContextAssembler, ContextFragment, FragmentLabel};
pub use ingest::{Clock, IngestAck, IngestionPipeline, local_clock};
pub use registry::{AgentDefaults, AgentRegistry};
pub use summarizer::Summarizer;

const CHAT_TEMPERATURE: f32 = 1.0;
const CHAT_MAX_TOKENS: u32 = 1024;
const CHAT_TOP_P: f32 = 1.0;

/// Facade over the journal pipeline, shared by every request handler.
pub struct Journal {
    registry: Arc<AgentRegistry>,
    pipeline: IngestionPipeline,
    assembler: ContextAssembler,
    summarizer: Summarizer,
}

impl Journal {
    pub fn new(
        entries: Arc<dyn EntryStore>,
        mappings: Arc<dyn AgentMappingStore>,
        agents: Arc<dyn AgentService>,
        llm: Arc<dyn LlmClient>,
        defaults: AgentDefaults,
    ) -> Self {
        let registry = Arc::new(AgentRegistry::new(mappings, agents.clone(), defaults));
        let summarizer = Summarizer::new(llm);
        let pipeline = IngestionPipeline::new(
            entries.clone(),
            agents.clone(),
            registry.clone(),
            summarizer.clone(),
        );
        let assembler = ContextAssembler::new(entries, agents);

        Self {
            registry,
            pipeline,
            assembler,
            summarizer,
        }
    }

    /// Replace the clock used to stamp entries.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.pipeline = self.pipeline.with_clock(clock);
        self
    }

    /// Log a message to the user's journal.
    pub async fn log_entry(&self, user_id: &str, message: &str) -> Result<IngestAck> {
        self.pipeline.ingest_for_user(user_id, message).await
    }

    /// Recall the user's memories for `range`.
    pub async fn recall(&self, user_id: &str, range: DateRange) -> Result<Vec<ContextFragment>> {
        let agent_id = self.registry.get_or_create_agent(user_id).await?;
        Ok(self.assembler.recall(user_id, &agent_id, range).await)
    }

    /// Summarize the user's memories for `range`.
    ///
    /// Returns `None` when nothing was recalled; the summarizer is not called
    /// in that case.
    pub async fn summarize(&self, user_id: &str, range: DateRange) -> Result<Option<String>> {
        let fragments = self.recall(user_id, range).await?;
        if fragments.is_empty() {
            debug!(user_id, start = %range.start, end = %range.end, "No memories recalled");
            return Ok(None);
        }
        let summary = self.summarizer.summarize(&fragments).await?;
        Ok(Some(summary))
    }

    /// Stream a free-form reply to `message`. Nothing is persisted.
    pub fn chat_stream(&self, message: &str) -> Result<StreamResult> {
        if message.trim().is_empty() {
            return Err(JournalError::validation("No message provided"));
        }
        let request = CompletionRequest::new(vec![Message::user(message)])
            .with_temperature(CHAT_TEMPERATURE)
            .with_max_tokens(CHAT_MAX_TOKENS)
            .with_top_p(CHAT_TOP_P);
        Ok(self.summarizer.llm().complete_stream(request))
    }

    /// Stop accepting relays and wait for the in-flight ones to finish.
    pub async fn drain_relays(&self) {
        let relays = self.pipeline.relays();
        relays.close();
        if !relays.is_empty() {
            info!(pending = relays.len(), "Waiting for agent relays to finish");
        }
        relays.wait().await;
    }
}
