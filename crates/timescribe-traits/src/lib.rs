//! Timescribe Traits - Shared data model and store contracts.
//!
//! This crate provides the interfaces shared across the Timescribe workspace:
//! - Journal data model (MemoryEntry, AgentHandle, DateRange)
//! - StoreError, the failure type of every store backend
//! - Store traits (EntryStore, AgentMappingStore)

pub mod error;
pub mod model;
pub mod store;

// ── Top-level re-exports ─────────────────────────────────────────────

pub use error::{Result as StoreResult, StoreError};
pub use model::{AgentHandle, DateRange, MemoryEntry};
pub use store::{AgentMappingStore, EntryStore};
