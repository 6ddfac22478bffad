//! Timescribe Storage - Row store backends for journal entries and agent mappings.
//!
//! Two backends implement the store traits from `timescribe-traits`:
//!
//! - [`Storage`]: embedded redb database, one file on disk
//! - [`SupabaseStore`]: hosted PostgREST row store
//!
//! # Tables
//!
//! - `journal_entries` - Timestamped journal entries
//! - `agent_ids` - User to agent mapping

pub mod agent_mapping;
pub mod entry;
pub mod range_utils;
pub mod supabase;

use anyhow::Result;
use redb::Database;
use std::sync::Arc;

pub use agent_mapping::AgentMappingStorage;
pub use entry::EntryStorage;
pub use supabase::SupabaseStore;

/// Central storage manager for the embedded backend
pub struct Storage {
    pub entries: EntryStorage,
    pub agents: AgentMappingStorage,
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// This will create the database file if it doesn't exist and initialize
    /// all required tables.
    pub fn new(path: &str) -> Result<Self> {
        let db = Arc::new(Database::create(path)?);

        let entries = EntryStorage::new(db.clone())?;
        let agents = AgentMappingStorage::new(db.clone())?;

        Ok(Self {
            entries,
            agents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;
    use timescribe_traits::{AgentHandle, AgentMappingStore, DateRange, EntryStore, MemoryEntry};

    #[tokio::test]
    async fn test_storage_reopens_with_data() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("journal.db");
        let path = db_path.to_str().unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        {
            let storage = Storage::new(path).unwrap();
            storage
                .entries
                .append(&MemoryEntry::new("sid", "persisted", day))
                .await
                .unwrap();
            storage
                .agents
                .insert_agent(&AgentHandle::new("sid", "agent-1"))
                .await
                .unwrap();
        }

        let storage = Storage::new(path).unwrap();
        let texts = storage
            .entries
            .query_range("sid", DateRange::day(day))
            .await
            .unwrap();
        assert_eq!(texts, vec!["persisted"]);
        assert!(storage.agents.find_agent("sid").await.unwrap().is_some());
    }
}
