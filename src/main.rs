//! City Guide - civic assistant for Thessaloniki
//!
//! Answers questions about outages, performances, movie screenings,
//! on-duty hospitals and the city's history from a Postgres dataset,
//! using a model for intent selection and reply synthesis.

mod api;
mod calendar;
mod catalog;
mod config;
mod db;
mod history;
mod intent;
mod llm;
mod query;
mod runtime;
mod state_machine;
mod synthesizer;
mod system_prompt;
mod text;

use api::{create_router, AppState};
use config::Config;
use db::Database;
use history::{HistoryStore, InMemoryHistory, RedisHistory};
use llm::{EmbeddingService, LlmConfig, ModelRegistry, OpenAIEmbeddings};
use query::QueryRegistry;
use runtime::{Orchestrator, RegistryLlmClient};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; the environment may already be set
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "city_guide=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env()?;

    // Database
    let database = Database::connect_lazy(&config.database_url, config.db_pool_size, config.query.db_timeout)?;
    match database.missing_extensions().await {
        Ok(missing) if missing.is_empty() => tracing::info!("Database reachable"),
        Ok(missing) => tracing::warn!(?missing, "Database is missing required extensions"),
        Err(e) => tracing::warn!(error = %e, "Database unreachable at startup, continuing"),
    }

    // Session history
    let history: Arc<dyn HistoryStore> = match &config.redis_url {
        Some(url) => match RedisHistory::connect(url, config.history).await {
            Ok(store) => {
                tracing::info!("Using Redis session history");
                Arc::new(store)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, falling back to in-memory history");
                Arc::new(InMemoryHistory::new(config.history))
            }
        },
        None => {
            tracing::warn!("REDIS_URL not set, session history is in-memory and per-process");
            Arc::new(InMemoryHistory::new(config.history))
        }
    };

    // Initialize LLM registry
    let llm_config = LlmConfig::from_env();
    let llm_registry = Arc::new(ModelRegistry::new(&llm_config));

    if llm_registry.has_models() {
        let context_window = llm_registry.default().map(|m| m.context_window());
        tracing::info!(
            models = ?llm_registry.available_models(),
            default = %llm_registry.default_model_id(),
            context_window,
            "LLM registry initialized"
        );
    } else {
        tracing::warn!("No LLM API keys configured. Set GEMINI_API_KEY or OPENAI_API_KEY.");
    }

    // Embeddings for history search
    let embeddings: Option<Arc<dyn EmbeddingService>> = match &llm_config.openai_api_key {
        Some(key) => match OpenAIEmbeddings::new(key.clone(), config.embedding_model.clone()) {
            Ok(service) => Some(Arc::new(service)),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to create embedding client");
                None
            }
        },
        None => None,
    };

    let queries = QueryRegistry::postgres(database.pool(), embeddings, config.query);
    tracing::info!(tools = ?queries.tools(), "Query executors registered");

    let llm = Arc::new(RegistryLlmClient::new(
        llm_registry.clone(),
        llm_registry.default_model_id().to_string(),
    ));
    let orchestrator = Orchestrator::new(
        llm,
        history.clone(),
        queries,
        config.model,
        config.history.context_turns,
    );

    // Create application state
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        database,
        history,
        llm_registry,
        health_timeout: config.health_timeout,
    };

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true).br(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("City Guide server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
