use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use serde::Deserialize;
use timescribe_core::IngestAck;
use tracing::{info, warn};

use crate::api::caller::CallerId;
use crate::api::error::ApiResult;
use crate::api::extract::Json;
use crate::api::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// POST /chat - log a journal entry.
pub async fn chat(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<IngestAck>> {
    let ack = state.journal.log_entry(&user_id, &request.message).await?;
    info!(user_id = %user_id, date = %ack.timestamp, "Journal entry logged");
    Ok(Json(ack))
}

/// POST /chat/stream - free-form reply streamed as plain text.
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Response> {
    let stream = state
        .journal
        .chat_stream(&request.message)?
        .map_ok(|chunk| chunk.text)
        .try_filter(|text| futures::future::ready(!text.is_empty()))
        .inspect_err(|e| warn!(error = %e, "Chat stream aborted"));

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(stream),
    )
        .into_response())
}
