//! Audio transcription client for the hosted speech API (Groq Whisper).

use reqwest::Client;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::error::{AiError, Result};
use crate::http_client::{build_http_client, truncate_body};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "whisper-large-v3";

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// Client for speech-to-text transcription.
#[derive(Clone)]
pub struct TranscriptionClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl TranscriptionClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn format_api_error(status: StatusCode, error_text: &str) -> String {
        match status {
            StatusCode::UNAUTHORIZED => "Invalid API key for the speech service.".to_string(),
            StatusCode::TOO_MANY_REQUESTS => "Rate limited, retry later.".to_string(),
            StatusCode::PAYLOAD_TOO_LARGE => "Audio file is too large.".to_string(),
            _ => {
                if error_text.trim().is_empty() {
                    format!("Transcription API returned HTTP {}.", status)
                } else {
                    truncate_body(error_text.to_string())
                }
            }
        }
    }

    /// Transcribe an uploaded audio file.
    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        filename: &str,
        language: Option<&str>,
    ) -> Result<String> {
        if audio.is_empty() {
            return Err(AiError::Transcription("Audio file is empty".to_string()));
        }

        let mut form = Form::new()
            .part(
                "file",
                Part::bytes(audio)
                    .file_name(filename.to_string())
                    .mime_str("application/octet-stream")?,
            )
            .text("model", self.model.clone());

        if let Some(language) = language {
            form = form.text("language", language.to_string());
        }

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AiError::Transcription(Self::format_api_error(
                status,
                &error_text,
            )));
        }

        let body: TranscriptionResponse = response.json().await.map_err(|_| {
            AiError::InvalidFormat(
                "Transcription API returned an unexpected response format".to_string(),
            )
        })?;

        tracing::debug!(model = %self.model, chars = body.text.len(), "Audio transcribed");
        Ok(body.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_transcribe_api_error_mapping() {
        let unauthorized =
            TranscriptionClient::format_api_error(StatusCode::UNAUTHORIZED, "ignored");
        assert!(unauthorized.contains("Invalid API key"));

        let rate_limited =
            TranscriptionClient::format_api_error(StatusCode::TOO_MANY_REQUESTS, "ignored");
        assert!(rate_limited.contains("Rate limited"));

        let passthrough =
            TranscriptionClient::format_api_error(StatusCode::BAD_REQUEST, "custom message");
        assert_eq!(passthrough, "custom message");
    }

    #[tokio::test]
    async fn test_transcribe_uploads_audio() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .and(header("authorization", "Bearer groq-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"text": "went for a run"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = TranscriptionClient::new("groq-key").with_base_url(server.uri());
        let text = client
            .transcribe(b"RIFF....WAVE".to_vec(), "note.wav", None)
            .await
            .unwrap();
        assert_eq!(text, "went for a run");

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("whisper-large-v3"));
        assert!(body.contains("note.wav"));
    }

    #[tokio::test]
    async fn test_empty_audio_is_rejected_locally() {
        let server = MockServer::start().await;
        let client = TranscriptionClient::new("groq-key").with_base_url(server.uri());
        let err = client.transcribe(Vec::new(), "note.wav", None).await.unwrap_err();
        assert!(matches!(err, AiError::Transcription(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
