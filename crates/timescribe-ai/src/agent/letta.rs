//! Letta agent-memory provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::agent::service::AgentService;
use crate::agent::types::{AgentContext, AgentReply, AgentSpec, ConversationTurn, MemoryBlock};
use crate::error::{AiError, Result};
use crate::http_client::{build_http_client, response_to_error};

pub const DEFAULT_BASE_URL: &str = "https://api.letta.com";

/// Letta client
#[derive(Clone)]
pub struct LettaClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LettaClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set custom base URL (self-hosted servers)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn agent_url(&self, agent_id: &str, suffix: &str) -> String {
        format!("{}/v1/agents/{}{}", self.base_url, agent_id, suffix)
    }
}

#[derive(Serialize)]
struct CreateAgentBody<'a> {
    model: &'a str,
    embedding: &'a str,
    memory_blocks: &'a [MemoryBlock],
}

#[derive(Deserialize)]
struct CreatedAgent {
    id: String,
}

#[derive(Deserialize)]
struct ContextWindow {
    #[serde(default)]
    core_memory: Option<String>,
    #[serde(default)]
    summary_memory: Option<String>,
    #[serde(default)]
    external_memory_summary: Option<String>,
    #[serde(default)]
    messages: Vec<LettaMessage>,
}

#[derive(Deserialize)]
struct LettaMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    message_type: Option<String>,
    #[serde(default)]
    content: Option<LettaContent>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LettaContent {
    Text(String),
    Parts(Vec<LettaContentPart>),
}

#[derive(Deserialize)]
struct LettaContentPart {
    #[serde(default)]
    text: Option<String>,
}

impl LettaMessage {
    fn text(&self) -> Option<String> {
        let text = match &self.content {
            Some(LettaContent::Text(text)) => text.clone(),
            Some(LettaContent::Parts(parts)) => parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join(""),
            None => self.text.clone().unwrap_or_default(),
        };
        if text.trim().is_empty() { None } else { Some(text) }
    }

    /// Only user and assistant turns belong to the conversation; system
    /// prompts, tool calls and tool returns are skipped.
    fn into_turn(self) -> Option<ConversationTurn> {
        let text = self.text()?;
        match self.role.as_deref() {
            Some("user") => Some(ConversationTurn::user(text)),
            Some("assistant") => Some(ConversationTurn::assistant(text)),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    messages: [OutgoingMessage<'a>; 1],
}

#[derive(Serialize)]
struct OutgoingMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    #[serde(default)]
    messages: Vec<LettaMessage>,
}

#[async_trait]
impl AgentService for LettaClient {
    fn provider(&self) -> &str {
        "letta"
    }

    async fn create_agent(&self, spec: &AgentSpec) -> Result<String> {
        let body = CreateAgentBody {
            model: &spec.model,
            embedding: &spec.embedding,
            memory_blocks: &spec.memory_blocks,
        };

        let response = self
            .client
            .post(format!("{}/v1/agents", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(response_to_error(response, "Letta").await);
        }

        let created: CreatedAgent = response.json().await?;
        tracing::info!(agent_id = %created.id, model = %spec.model, "Letta agent created");
        Ok(created.id)
    }

    async fn retrieve_context(&self, agent_id: &str) -> Result<AgentContext> {
        let response = self
            .client
            .get(self.agent_url(agent_id, "/context"))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(response_to_error(response, "Letta").await);
        }

        let window: ContextWindow = response.json().await?;
        Ok(AgentContext {
            core_memory: window.core_memory.unwrap_or_default(),
            summary_memory: window.summary_memory,
            external_memory_summary: window.external_memory_summary.unwrap_or_default(),
            messages: window
                .messages
                .into_iter()
                .filter_map(LettaMessage::into_turn)
                .collect(),
        })
    }

    async fn send_message(&self, agent_id: &str, content: &str) -> Result<AgentReply> {
        let body = SendMessageBody {
            messages: [OutgoingMessage {
                role: "user",
                content,
            }],
        };

        let response = self
            .client
            .post(self.agent_url(agent_id, "/messages"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(response_to_error(response, "Letta").await);
        }

        let reply: SendMessageResponse = response.json().await?;
        if reply.messages.is_empty() {
            return Err(AiError::InvalidFormat(
                "Letta returned no messages for the submitted turn".to_string(),
            ));
        }

        let assistant_text = reply
            .messages
            .iter()
            .rev()
            .find(|m| {
                m.message_type.as_deref() == Some("assistant_message")
                    || m.role.as_deref() == Some("assistant")
            })
            .and_then(LettaMessage::text);

        Ok(AgentReply {
            message_count: reply.messages.len(),
            assistant_text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::TurnRole;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_create_agent_sends_memory_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/agents"))
            .and(header("authorization", "Bearer letta-key"))
            .and(body_json(json!({
                "model": "openai/gpt-4",
                "embedding": "openai/text-embedding-3-small",
                "memory_blocks": [
                    {"label": "human", "value": "User name: sid"},
                    {"label": "persona", "value": "journal keeper"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "agent-42",
                "name": "sid-journal"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = LettaClient::new("letta-key").with_base_url(server.uri());
        let spec = AgentSpec {
            model: "openai/gpt-4".to_string(),
            embedding: "openai/text-embedding-3-small".to_string(),
            memory_blocks: vec![
                MemoryBlock::new("human", "User name: sid"),
                MemoryBlock::new("persona", "journal keeper"),
            ],
        };

        assert_eq!(client.create_agent(&spec).await.unwrap(), "agent-42");
    }

    #[tokio::test]
    async fn test_retrieve_context_keeps_conversation_turns() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/agents/agent-42/context"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "core_memory": "<human>User name: sid</human>",
                "summary_memory": null,
                "external_memory_summary": "3 archival memories",
                "messages": [
                    {"role": "system", "content": [{"type": "text", "text": "You are..."}]},
                    {"role": "user", "content": [{"type": "text", "text": "ran 5k"}]},
                    {"role": "tool", "content": "ok"},
                    {"role": "assistant", "content": "Nice run!"},
                    {"role": "user", "text": "slept early"}
                ]
            })))
            .mount(&server)
            .await;

        let client = LettaClient::new("letta-key").with_base_url(server.uri());
        let context = client.retrieve_context("agent-42").await.unwrap();

        assert_eq!(context.core_memory, "<human>User name: sid</human>");
        assert_eq!(context.summary_memory, None);
        assert_eq!(context.external_memory_summary, "3 archival memories");
        let roles: Vec<TurnRole> = context.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![TurnRole::User, TurnRole::Assistant, TurnRole::User]
        );
        assert_eq!(context.messages[0].content, "ran 5k");
        assert_eq!(context.messages[2].content, "slept early");
    }

    #[tokio::test]
    async fn test_send_message_requires_a_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/agents/agent-42/messages"))
            .and(body_json(json!({
                "messages": [{"role": "user", "content": "ran 5k"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [
                    {"message_type": "reasoning_message", "reasoning": "store it"},
                    {"message_type": "assistant_message", "content": "Noted!"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/agents/agent-empty/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"messages": []})))
            .mount(&server)
            .await;

        let client = LettaClient::new("letta-key").with_base_url(server.uri());
        let reply = client.send_message("agent-42", "ran 5k").await.unwrap();
        assert_eq!(reply.message_count, 2);
        assert_eq!(reply.assistant_text.as_deref(), Some("Noted!"));

        let err = client
            .send_message("agent-empty", "ran 5k")
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::InvalidFormat(_)));
    }

    #[tokio::test]
    async fn test_http_errors_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/agents/missing/context"))
            .respond_with(ResponseTemplate::new(404).set_body_string("agent not found"))
            .mount(&server)
            .await;

        let client = LettaClient::new("letta-key").with_base_url(server.uri());
        let err = client.retrieve_context("missing").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
}
