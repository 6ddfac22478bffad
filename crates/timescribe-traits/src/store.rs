//! Store trait abstractions.
//!
//! These traits define the persistence interfaces the journal core requires.
//! Implementations are provided by downstream crates (e.g., timescribe-storage).

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{AgentHandle, DateRange, MemoryEntry};

// ── EntryStore ───────────────────────────────────────────────────────

/// Append-only, range-queryable store of journal entries.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Durably store one entry.
    async fn append(&self, entry: &MemoryEntry) -> Result<()>;

    /// Texts of the user's entries whose timestamp falls inside `range`
    /// (inclusive), in store order. Empty ranges yield an empty result.
    async fn query_range(&self, user_id: &str, range: DateRange) -> Result<Vec<String>>;
}

// ── AgentMappingStore ────────────────────────────────────────────────

/// Persistent user → agent mapping.
///
/// Implementations must enforce uniqueness on `user_id`: inserting a second
/// handle for the same user fails with [`StoreError::Conflict`](crate::StoreError::Conflict).
#[async_trait]
pub trait AgentMappingStore: Send + Sync {
    async fn find_agent(&self, user_id: &str) -> Result<Option<AgentHandle>>;

    async fn insert_agent(&self, handle: &AgentHandle) -> Result<()>;
}
