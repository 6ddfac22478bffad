use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

use timescribe_core::journal::registry::{DEFAULT_AGENT_MODEL, DEFAULT_EMBEDDING_MODEL};

/// Where journal entries and agent mappings live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Embedded redb database file.
    Embedded { db_path: String },
    /// Hosted PostgREST row store.
    Supabase {
        url: String,
        api_key: String,
        entries_table: String,
        agents_table: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub default_user: String,
    pub store: StoreBackend,
    pub groq_api_key: String,
    pub groq_model: String,
    pub groq_base_url: Option<String>,
    pub speech_api_key: Option<String>,
    pub speech_model: String,
    pub letta_api_key: String,
    pub letta_base_url: Option<String>,
    pub agent_model: String,
    pub agent_embedding: String,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    store: StoreSection,
    #[serde(default)]
    groq: GroqSection,
    #[serde(default)]
    speech: SpeechSection,
    #[serde(default)]
    letta: LettaSection,
    #[serde(default)]
    agent: AgentSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_user")]
    default_user: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            default_user: default_user(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StoreSection {
    #[serde(default = "default_backend")]
    backend: String,
    #[serde(default = "default_db_path")]
    db_path: String,
    #[serde(default)]
    supabase_url: Option<String>,
    #[serde(default)]
    supabase_key: Option<String>,
    #[serde(default = "default_entries_table")]
    entries_table: String,
    #[serde(default = "default_agents_table")]
    agents_table: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            db_path: default_db_path(),
            supabase_url: None,
            supabase_key: None,
            entries_table: default_entries_table(),
            agents_table: default_agents_table(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct GroqSection {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpeechSection {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default = "default_speech_model")]
    model: String,
}

impl Default for SpeechSection {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_speech_model(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct LettaSection {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AgentSection {
    #[serde(default = "default_agent_model")]
    model: String,
    #[serde(default = "default_agent_embedding")]
    embedding: String,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            model: default_agent_model(),
            embedding: default_agent_embedding(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8001
}

fn default_user() -> String {
    "default".to_string()
}

fn default_backend() -> String {
    "redb".to_string()
}

fn default_db_path() -> String {
    "timescribe.db".to_string()
}

fn default_entries_table() -> String {
    "memories".to_string()
}

fn default_agents_table() -> String {
    "agent_ids".to_string()
}

fn default_speech_model() -> String {
    timescribe_ai::transcribe::DEFAULT_MODEL.to_string()
}

fn default_groq_model() -> String {
    timescribe_ai::llm::groq::DEFAULT_MODEL.to_string()
}

fn default_agent_model() -> String {
    DEFAULT_AGENT_MODEL.to_string()
}

fn default_agent_embedding() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

/// Lookup used for every environment read, so tests can supply a map.
type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn process_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn require(value: Option<String>, name: &str) -> anyhow::Result<String> {
    value.ok_or_else(|| anyhow::anyhow!("{} is not configured", name))
}

impl ServerConfig {
    /// Load from `TIMESCRIBE_CONFIG` or `./timescribe.toml`, falling back to
    /// environment variables when no file exists.
    pub fn load() -> anyhow::Result<Self> {
        if let Some(file_config) = load_from_file()? {
            return Self::from_file(file_config, &process_env);
        }

        Self::from_env(&process_env)
    }

    fn from_file(file: FileConfig, lookup: EnvLookup<'_>) -> anyhow::Result<Self> {
        let store = build_store(
            &file.store.backend,
            file.store.db_path,
            file.store.supabase_url.or_else(|| lookup("SUPABASE_URL")),
            file.store.supabase_key.or_else(|| lookup("SUPABASE_KEY")),
            file.store.entries_table,
            file.store.agents_table,
        )?;

        let groq_api_key = require(
            file.groq.api_key.or_else(|| lookup("GROQ_API_KEY")),
            "GROQ_API_KEY",
        )?;

        Ok(Self {
            host: file.server.host,
            port: file.server.port,
            default_user: file.server.default_user,
            store,
            speech_api_key: file
                .speech
                .api_key
                .or_else(|| lookup("GROQ_SPEECH_API_KEY"))
                .or_else(|| Some(groq_api_key.clone())),
            groq_api_key,
            groq_model: file.groq.model.unwrap_or_else(default_groq_model),
            groq_base_url: file.groq.base_url,
            speech_model: file.speech.model,
            letta_api_key: require(
                file.letta.api_key.or_else(|| lookup("LETTA_API_KEY")),
                "LETTA_API_KEY",
            )?,
            letta_base_url: file.letta.base_url.or_else(|| lookup("LETTA_BASE_URL")),
            agent_model: file.agent.model,
            agent_embedding: file.agent.embedding,
        })
    }

    fn from_env(lookup: EnvLookup<'_>) -> anyhow::Result<Self> {
        let host = lookup("TIMESCRIBE_HOST").unwrap_or_else(default_host);
        let port = lookup("TIMESCRIBE_PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or_else(default_port);
        let default_user = lookup("TIMESCRIBE_DEFAULT_USER").unwrap_or_else(default_user);

        let store = build_store(
            &lookup("TIMESCRIBE_STORE").unwrap_or_else(default_backend),
            lookup("TIMESCRIBE_DB_PATH").unwrap_or_else(default_db_path),
            lookup("SUPABASE_URL"),
            lookup("SUPABASE_KEY"),
            default_entries_table(),
            default_agents_table(),
        )?;

        let groq_api_key = require(lookup("GROQ_API_KEY"), "GROQ_API_KEY")?;

        Ok(Self {
            host,
            port,
            default_user,
            store,
            speech_api_key: lookup("GROQ_SPEECH_API_KEY").or_else(|| Some(groq_api_key.clone())),
            groq_api_key,
            groq_model: lookup("GROQ_MODEL").unwrap_or_else(default_groq_model),
            groq_base_url: None,
            speech_model: default_speech_model(),
            letta_api_key: require(lookup("LETTA_API_KEY"), "LETTA_API_KEY")?,
            letta_base_url: lookup("LETTA_BASE_URL"),
            agent_model: default_agent_model(),
            agent_embedding: default_agent_embedding(),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn build_store(
    backend: &str,
    db_path: String,
    supabase_url: Option<String>,
    supabase_key: Option<String>,
    entries_table: String,
    agents_table: String,
) -> anyhow::Result<StoreBackend> {
    match backend {
        "redb" | "embedded" => Ok(StoreBackend::Embedded { db_path }),
        "supabase" => Ok(StoreBackend::Supabase {
            url: require(supabase_url, "SUPABASE_URL")?,
            api_key: require(supabase_key, "SUPABASE_KEY")?,
            entries_table,
            agents_table,
        }),
        other => anyhow::bail!("Unknown store backend '{}' (expected redb or supabase)", other),
    }
}

fn load_from_file() -> anyhow::Result<Option<FileConfig>> {
    let config_path = env::var("TIMESCRIBE_CONFIG").ok();
    let path = if let Some(path) = config_path {
        Some(path)
    } else if Path::new("timescribe.toml").exists() {
        Some("timescribe.toml".to_string())
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(None);
    };

    let contents = fs::read_to_string(&path)
        .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path, err))?;
    let parsed: FileConfig = toml::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path, err))?;
    Ok(Some(parsed))
}
