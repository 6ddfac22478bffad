pub mod caller;
pub mod chat;
pub mod error;
pub mod extract;
pub mod health;
pub mod state;
pub mod summarize;
pub mod transcribe;

#[cfg(test)]
mod tests;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, Method, header},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

pub use state::{AppState, ServerState};

// Matches the hosted speech API's upload limit.
const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// Build the HTTP router over the shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(caller::USER_ID_HEADER),
        ]);

    Router::new()
        .route("/health", get(health::health))
        .route("/chat", post(chat::chat))
        .route("/chat/stream", post(chat::chat_stream))
        .route("/summarize", post(summarize::summarize))
        .route(
            "/transcribe",
            post(transcribe::transcribe).layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES)),
        )
        .layer(cors)
        .with_state(state)
}
