//! Timescribe Core - the memory journal pipeline.
//!
//! - [`journal::IngestionPipeline`]: stamp, persist, condense and relay entries
//! - [`journal::AgentRegistry`]: one hosted memory agent per user
//! - [`journal::ContextAssembler`]: fuse agent memory and stored entries
//! - [`journal::Summarizer`]: completion-backed condensation and summaries
//! - [`Journal`]: the facade the HTTP layer talks to

pub mod error;
pub mod journal;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::{JournalError, Result};
pub use journal::{
    AgentDefaults, ContextFragment, FragmentLabel, IngestAck, Journal, local_clock,
};
