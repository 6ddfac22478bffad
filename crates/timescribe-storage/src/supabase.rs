//! Hosted row store backend (Supabase / PostgREST).
//!
//! # Tables
//!
//! - `<entries_table>`: `{user_id, message_text, timestamp}` rows
//! - `<agents_table>`: `{user_id, agent_id}` rows, `user_id` unique

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use timescribe_traits::{
    AgentHandle, AgentMappingStore, DateRange, EntryStore, MemoryEntry, StoreError, StoreResult,
};

pub const DEFAULT_ENTRIES_TABLE: &str = "memories";
pub const DEFAULT_AGENTS_TABLE: &str = "agent_ids";

/// Row store client speaking the PostgREST dialect used by Supabase.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    api_key: String,
    entries_table: String,
    agents_table: String,
}

#[derive(Serialize)]
struct EntryRow<'a> {
    user_id: &'a str,
    message_text: &'a str,
    timestamp: NaiveDate,
}

#[derive(Deserialize)]
struct EntryTextRow {
    message_text: String,
}

#[derive(Serialize, Deserialize)]
struct AgentRow {
    user_id: String,
    agent_id: String,
}

impl SupabaseStore {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            client: build_http_client(),
            base_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            api_key: api_key.into(),
            entries_table: DEFAULT_ENTRIES_TABLE.to_string(),
            agents_table: DEFAULT_AGENTS_TABLE.to_string(),
        }
    }

    pub fn with_entries_table(mut self, table: impl Into<String>) -> Self {
        self.entries_table = table.into();
        self
    }

    pub fn with_agents_table(mut self, table: impl Into<String>) -> Self {
        self.agents_table = table.into();
        self
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    async fn send(&self, builder: RequestBuilder, action: &str) -> StoreResult<Response> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("{} failed: {}", action, e)))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(response_to_error(response, action).await)
        }
    }
}

const DISABLE_SYSTEM_PROXY_ENV: &str = "TIMESCRIBE_DISABLE_SYSTEM_PROXY";

fn build_http_client() -> Client {
    if std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() || cfg!(test) {
        Client::builder()
            .no_proxy()
            .build()
            .unwrap_or_else(|_| Client::new())
    } else {
        Client::new()
    }
}

/// Map a non-success PostgREST response onto the store error taxonomy.
pub async fn response_to_error(response: Response, action: &str) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    // Truncate error body to prevent leaking large or sensitive responses.
    const MAX_ERROR_BODY: usize = 512;
    let body = if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... [truncated]", &body[..cut])
    } else {
        body
    };
    let message = format!("{} returned HTTP {}: {}", action, status.as_u16(), body);

    match status {
        StatusCode::CONFLICT => StoreError::Conflict(message),
        s if s.is_server_error() => StoreError::Unavailable(message),
        _ => StoreError::Rejected(message),
    }
}

#[async_trait]
impl EntryStore for SupabaseStore {
    async fn append(&self, entry: &MemoryEntry) -> StoreResult<()> {
        let row = EntryRow {
            user_id: &entry.user_id,
            message_text: &entry.text,
            timestamp: entry.timestamp,
        };
        let builder = self
            .client
            .post(self.table_url(&self.entries_table))
            .header("Prefer", "return=minimal")
            .json(&row);

        self.send(builder, "entry insert").await?;
        tracing::debug!(user_id = %entry.user_id, date = %entry.timestamp, "Entry stored");
        Ok(())
    }

    async fn query_range(&self, user_id: &str, range: DateRange) -> StoreResult<Vec<String>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let builder = self.client.get(self.table_url(&self.entries_table)).query(&[
            ("select", "message_text".to_string()),
            ("user_id", format!("eq.{}", user_id)),
            ("timestamp", format!("gte.{}", range.start)),
            ("timestamp", format!("lte.{}", range.end)),
        ]);

        let response = self.send(builder, "entry range query").await?;
        let rows: Vec<EntryTextRow> = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(format!("entry rows: {}", e)))?;

        Ok(rows.into_iter().map(|row| row.message_text).collect())
    }
}

#[async_trait]
impl AgentMappingStore for SupabaseStore {
    async fn find_agent(&self, user_id: &str) -> StoreResult<Option<AgentHandle>> {
        let builder = self.client.get(self.table_url(&self.agents_table)).query(&[
            ("select", "user_id,agent_id".to_string()),
            ("user_id", format!("eq.{}", user_id)),
            ("limit", "1".to_string()),
        ]);

        let response = self.send(builder, "agent lookup").await?;
        let rows: Vec<AgentRow> = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(format!("agent rows: {}", e)))?;

        Ok(rows
            .into_iter()
            .next()
            .map(|row| AgentHandle::new(row.user_id, row.agent_id)))
    }

    async fn insert_agent(&self, handle: &AgentHandle) -> StoreResult<()> {
        let row = AgentRow {
            user_id: handle.user_id.clone(),
            agent_id: handle.agent_id.clone(),
        };
        let builder = self
            .client
            .post(self.table_url(&self.agents_table))
            .header("Prefer", "return=minimal")
            .json(&row);

        self.send(builder, "agent insert").await?;
        Ok(())
    }
}
