use axum::{
    extract::{Multipart, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use timescribe_core::JournalError;
use tracing::{debug, info};

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::Json;
use crate::api::state::AppState;

const AUDIO_FIELD: &str = "audio";

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub transcription: String,
}

/// POST /transcribe - turn an uploaded recording into text.
pub async fn transcribe(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<TranscribeResponse>> {
    let Some(transcriber) = state.transcriber.as_ref() else {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Transcription is not configured",
        ));
    };

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("audio.webm").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read audio: {}", e)))?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let Some((filename, audio)) = upload else {
        return Err(ApiError::bad_request("No audio file provided"));
    };
    if audio.is_empty() {
        return Err(ApiError::bad_request("Audio file is empty"));
    }
    debug!(filename = %filename, bytes = audio.len(), "Received audio upload");

    let transcription = transcriber
        .transcribe(audio, &filename, None)
        .await
        .map_err(|e| ApiError::from(JournalError::ExternalService(e)))?;

    info!(chars = transcription.len(), "Audio transcribed");
    Ok(Json(TranscribeResponse { transcription }))
}
