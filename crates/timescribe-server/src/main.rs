#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod api;
mod config;

use std::sync::Arc;

use anyhow::Context;
use timescribe_ai::{AgentService, GroqClient, LettaClient, LlmClient, TranscriptionClient};
use timescribe_core::{AgentDefaults, Journal};
use timescribe_storage::{Storage, SupabaseStore};
use timescribe_traits::{AgentMappingStore, EntryStore};

use api::{AppState, ServerState};
use config::{ServerConfig, StoreBackend};

type Stores = (Arc<dyn EntryStore>, Arc<dyn AgentMappingStore>);

fn build_stores(backend: &StoreBackend) -> anyhow::Result<Stores> {
    match backend {
        StoreBackend::Embedded { db_path } => {
            let storage = Storage::new(db_path)
                .with_context(|| format!("Failed to open database at {}", db_path))?;
            tracing::info!(db_path = %db_path, "Using embedded store");
            let entries: Arc<dyn EntryStore> = Arc::new(storage.entries.clone());
            let mappings: Arc<dyn AgentMappingStore> = Arc::new(storage.agents.clone());
            Ok((entries, mappings))
        }
        StoreBackend::Supabase {
            url,
            api_key,
            entries_table,
            agents_table,
        } => {
            let store = SupabaseStore::new(url.clone(), api_key.clone())
                .with_entries_table(entries_table.clone())
                .with_agents_table(agents_table.clone());
            tracing::info!(url = %url, "Using hosted row store");
            let store = Arc::new(store);
            let entries: Arc<dyn EntryStore> = store.clone();
            let mappings: Arc<dyn AgentMappingStore> = store;
            Ok((entries, mappings))
        }
    }
}

fn build_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let (entries, mappings) = build_stores(&config.store)?;

    let mut groq = GroqClient::new(config.groq_api_key.clone()).with_model(config.groq_model.clone());
    if let Some(base_url) = &config.groq_base_url {
        groq = groq.with_base_url(base_url.clone());
    }
    let llm: Arc<dyn LlmClient> = Arc::new(groq);

    let mut letta = LettaClient::new(config.letta_api_key.clone());
    if let Some(base_url) = &config.letta_base_url {
        letta = letta.with_base_url(base_url.clone());
    }
    let agents: Arc<dyn AgentService> = Arc::new(letta);

    let defaults = AgentDefaults {
        model: config.agent_model.clone(),
        embedding: config.agent_embedding.clone(),
        ..AgentDefaults::default()
    };

    let transcriber = config.speech_api_key.as_ref().map(|key| {
        let client = TranscriptionClient::new(key.clone()).with_model(config.speech_model.clone());
        match &config.groq_base_url {
            Some(base_url) => client.with_base_url(base_url.clone()),
            None => client,
        }
    });

    Ok(Arc::new(ServerState {
        journal: Journal::new(entries, mappings, agents, llm, defaults),
        transcriber,
        default_user: config.default_user.clone(),
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested, no longer accepting requests");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; variables may come from the environment.
    let _ = dotenvy::dotenv();

    // Initialize tracing logger
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,timescribe_server=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting Timescribe server");

    let config = ServerConfig::load().context("Failed to load server configuration")?;
    let state = build_state(&config)?;
    let app = api::router(state.clone());

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Timescribe running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    state.journal.drain_relays().await;
    tracing::info!("Timescribe stopped");
    Ok(())
}
