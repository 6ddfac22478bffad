use std::sync::Arc;

use timescribe_ai::TranscriptionClient;
use timescribe_core::Journal;

/// Everything request handlers need, built once at startup.
pub struct ServerState {
    pub journal: Journal,
    /// `None` when no speech key is configured.
    pub transcriber: Option<TranscriptionClient>,
    /// Identity used when a request carries no `x-user-id` header.
    pub default_user: String,
}

/// Application state shared across all API handlers
pub type AppState = Arc<ServerState>;
