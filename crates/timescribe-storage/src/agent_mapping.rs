//! Agent mapping storage - embedded user -> agent persistence.

use anyhow::Result;
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;
use timescribe_traits::{AgentHandle, AgentMappingStore, StoreError, StoreResult};

const AGENT_TABLE: TableDefinition<&str, &str> = TableDefinition::new("agent_ids");

/// Embedded agent mapping store backed by redb
#[derive(Debug, Clone)]
pub struct AgentMappingStorage {
    db: Arc<Database>,
}

impl AgentMappingStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(AGENT_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub fn get_agent_id(&self, user_id: &str) -> Result<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AGENT_TABLE)?;

        if let Some(value) = table.get(user_id)? {
            Ok(Some(value.value().to_string()))
        } else {
            Ok(None)
        }
    }

    /// Insert the mapping unless the user already has one.
    ///
    /// Check and insert share one write transaction, so the first writer wins.
    /// Returns false when a mapping already existed.
    pub fn put_if_absent(&self, user_id: &str, agent_id: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let inserted = {
            let mut table = write_txn.open_table(AGENT_TABLE)?;
            let exists = table.get(user_id)?.is_some();
            if !exists {
                table.insert(user_id, agent_id)?;
            }
            !exists
        };
        write_txn.commit()?;
        Ok(inserted)
    }
}

#[async_trait]
impl AgentMappingStore for AgentMappingStorage {
    async fn find_agent(&self, user_id: &str) -> StoreResult<Option<AgentHandle>> {
        let agent_id = self.get_agent_id(user_id)?;
        Ok(agent_id.map(|agent_id| AgentHandle::new(user_id, agent_id)))
    }

    async fn insert_agent(&self, handle: &AgentHandle) -> StoreResult<()> {
        if self.put_if_absent(&handle.user_id, &handle.agent_id)? {
            Ok(())
        } else {
            Err(StoreError::Conflict(format!(
                "agent mapping for user {}",
                handle.user_id
            )))
        }
    }
}
