//! In-memory store doubles for pipeline and route tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use timescribe_traits::{
    AgentHandle, AgentMappingStore, DateRange, EntryStore, MemoryEntry, StoreError, StoreResult,
};

/// Entry store kept in a vector, with switchable failures.
#[derive(Debug, Default)]
pub struct InMemoryEntryStore {
    entries: Mutex<Vec<MemoryEntry>>,
    fail_appends: AtomicBool,
    fail_queries: AtomicBool,
}

impl InMemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Every stored entry, in append order.
    pub fn entries(&self) -> Vec<MemoryEntry> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl EntryStore for InMemoryEntryStore {
    async fn append(&self, entry: &MemoryEntry) -> StoreResult<()> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".to_string()));
        }
        self.entries.lock().push(entry.clone());
        Ok(())
    }

    async fn query_range(&self, user_id: &str, range: DateRange) -> StoreResult<Vec<String>> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".to_string()));
        }
        let entries = self.entries.lock();
        let mut matching: Vec<&MemoryEntry> = entries
            .iter()
            .filter(|entry| entry.user_id == user_id && range.contains(entry.timestamp))
            .collect();
        // Stable sort keeps insertion order within a day.
        matching.sort_by_key(|entry| entry.timestamp);
        Ok(matching.into_iter().map(|entry| entry.text.clone()).collect())
    }
}

/// Mapping store kept in a vector, enforcing one handle per user.
#[derive(Debug, Default)]
pub struct InMemoryMappingStore {
    handles: Mutex<Vec<AgentHandle>>,
    fail_writes: AtomicBool,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AgentMappingStore for InMemoryMappingStore {
    async fn find_agent(&self, user_id: &str) -> StoreResult<Option<AgentHandle>> {
        Ok(self
            .handles
            .lock()
            .iter()
            .find(|handle| handle.user_id == user_id)
            .cloned())
    }

    async fn insert_agent(&self, handle: &AgentHandle) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("in-memory store is read-only".to_string()));
        }
        let mut handles = self.handles.lock();
        if handles.iter().any(|h| h.user_id == handle.user_id) {
            return Err(StoreError::Conflict(handle.user_id.clone()));
        }
        handles.push(handle.clone());
        Ok(())
    }
}

/// Mapping store that loses the check-then-create race: lookups find
/// nothing until the first insert, which fails with a conflict because a
/// rival process stored `rival` in the meantime.
#[derive(Debug)]
pub struct RacingMappingStore {
    rival: AgentHandle,
    stored: Mutex<Option<AgentHandle>>,
}

impl RacingMappingStore {
    pub fn new(rival: AgentHandle) -> Self {
        Self {
            rival,
            stored: Mutex::new(None),
        }
    }
}

#[async_trait]
impl AgentMappingStore for RacingMappingStore {
    async fn find_agent(&self, user_id: &str) -> StoreResult<Option<AgentHandle>> {
        Ok(self
            .stored
            .lock()
            .as_ref()
            .filter(|handle| handle.user_id == user_id)
            .cloned())
    }

    async fn insert_agent(&self, handle: &AgentHandle) -> StoreResult<()> {
        *self.stored.lock() = Some(self.rival.clone());
        Err(StoreError::Conflict(handle.user_id.clone()))
    }
}
