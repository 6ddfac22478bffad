//! Completion-backed condensation and summarization.

use std::sync::Arc;

use tracing::debug;

use timescribe_ai::{CompletionRequest, LlmClient, Message};

use crate::error::{JournalError, Result};
use crate::journal::assembler::ContextFragment;

const CONDENSE_INSTRUCTION: &str = "Extract the important details from the user's journal \
entry and restate them in one short message. Keep names, dates, places and feelings. \
Do not add anything that is not in the entry.";

const SUMMARY_INSTRUCTION: &str = "You summarize a person's memory journal. Using only the \
memories provided, write a short conversational summary in plain prose addressed to the \
user. Do not invent events, do not embellish, and do not use lists or headings.";

const CONDENSE_MAX_TOKENS: u32 = 256;
const SUMMARY_MAX_TOKENS: u32 = 1024;

/// Wraps the completion client with the journal's two fixed prompts.
#[derive(Clone)]
pub struct Summarizer {
    llm: Arc<dyn LlmClient>,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub fn llm(&self) -> &Arc<dyn LlmClient> {
        &self.llm
    }

    /// Condense one stamped entry into the short form relayed to the agent.
    pub async fn condense(&self, stamped_text: &str) -> Result<String> {
        let request = CompletionRequest::deterministic(vec![
            Message::system(CONDENSE_INSTRUCTION),
            Message::user(stamped_text),
        ])
        .with_max_tokens(CONDENSE_MAX_TOKENS);

        self.complete_text(request).await
    }

    /// Summarize assembled fragments into prose with a single completion call.
    pub async fn summarize(&self, fragments: &[ContextFragment]) -> Result<String> {
        if fragments.is_empty() {
            return Err(JournalError::validation("Nothing to summarize"));
        }

        let memories = fragments
            .iter()
            .map(ContextFragment::render)
            .collect::<Vec<_>>()
            .join("\n");

        let request = CompletionRequest::deterministic(vec![
            Message::system(SUMMARY_INSTRUCTION),
            Message::user(memories),
        ])
        .with_max_tokens(SUMMARY_MAX_TOKENS);

        debug!(fragments = fragments.len(), "Summarizing journal context");
        self.complete_text(request).await
    }

    async fn complete_text(&self, request: CompletionRequest) -> Result<String> {
        let response = self.llm.complete(request).await?;
        Ok(response.content.unwrap_or_default().trim().to_string())
    }
}
