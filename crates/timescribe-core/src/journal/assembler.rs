//! Context assembly over the two memory sources.
//!
//! The agent service holds the user's core memory, rolling summaries and
//! recent conversation; the entry store holds raw entries. Recall fuses both
//! into one ordered list of labeled fragments without deduplication or
//! ranking.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use timescribe_ai::{AgentContext, AgentService, TurnRole};
use timescribe_traits::{DateRange, EntryStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FragmentLabel {
    CoreMemory,
    Summary,
    LongTermSummary,
    ConversationTurn(TurnRole),
    StoredEntry,
}

impl fmt::Display for FragmentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentLabel::CoreMemory => write!(f, "core-memory"),
            FragmentLabel::Summary => write!(f, "summary"),
            FragmentLabel::LongTermSummary => write!(f, "long-term-summary"),
            FragmentLabel::ConversationTurn(role) => {
                write!(f, "conversation-turn/{}", role.as_str())
            }
            FragmentLabel::StoredEntry => write!(f, "stored-entry"),
        }
    }
}

/// One labeled piece of recalled memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextFragment {
    pub label: FragmentLabel,
    pub text: String,
}

impl ContextFragment {
    pub fn new(label: FragmentLabel, text: impl Into<String>) -> Self {
        Self {
            label,
            text: text.into(),
        }
    }

    /// Single-line prompt form, e.g. `[stored-entry] Went for a run`.
    pub fn render(&self) -> String {
        format!("[{}] {}", self.label, self.text)
    }
}

pub struct ContextAssembler {
    entries: Arc<dyn EntryStore>,
    agents: Arc<dyn AgentService>,
}

impl ContextAssembler {
    pub fn new(entries: Arc<dyn EntryStore>, agents: Arc<dyn AgentService>) -> Self {
        Self { entries, agents }
    }

    /// Gather the user's memory for `range`.
    ///
    /// Both sources are best-effort: a failing source is logged and
    /// contributes nothing. An empty result means there is nothing to
    /// summarize.
    pub async fn recall(
        &self,
        user_id: &str,
        agent_id: &str,
        range: DateRange,
    ) -> Vec<ContextFragment> {
        let context = match self.agents.retrieve_context(agent_id).await {
            Ok(context) => context,
            Err(e) => {
                warn!(user_id, agent_id, error = %e, "Agent context unavailable, continuing without it");
                AgentContext::default()
            }
        };

        let stored = match self.entries.query_range(user_id, range).await {
            Ok(texts) => texts,
            Err(e) => {
                warn!(user_id, error = %e, "Entry query failed, continuing without stored entries");
                Vec::new()
            }
        };

        fuse(context, stored)
    }
}

fn fuse(context: AgentContext, stored: Vec<String>) -> Vec<ContextFragment> {
    let mut fragments = Vec::with_capacity(3 + context.messages.len() + stored.len());

    let memory_sections = [
        (FragmentLabel::CoreMemory, Some(context.core_memory)),
        (FragmentLabel::Summary, context.summary_memory),
        (
            FragmentLabel::LongTermSummary,
            Some(context.external_memory_summary),
        ),
    ];
    for (label, text) in memory_sections {
        if let Some(text) = text
            && !text.trim().is_empty()
        {
            fragments.push(ContextFragment::new(label, text));
        }
    }

    fragments.extend(
        context
            .messages
            .into_iter()
            .map(|turn| ContextFragment::new(FragmentLabel::ConversationTurn(turn.role), turn.content)),
    );
    fragments.extend(
        stored
            .into_iter()
            .map(|text| ContextFragment::new(FragmentLabel::StoredEntry, text)),
    );
    fragments
}
