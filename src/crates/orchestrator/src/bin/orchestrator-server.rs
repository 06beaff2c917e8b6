//! Orchestrator server binary
//!
//! Serves the brew chat and investigator endpoints over HTTP. Configuration
//! comes from `orchestrator.toml` plus `ORCHESTRATOR_*` overrides.

use anyhow::Context;
use langgraph_core::checkpoint::{CheckpointSaver, InMemoryCheckpointSaver};
use llm::{ChatModel, OpenAiCompatClient, RemoteLlmConfig};
use orchestrator::api::create_router;
use orchestrator::config::ServerConfig;
use orchestrator::db::{DatabaseConnection, SqliteCheckpointSaver};
use orchestrator::runtime::{AgentRuntime, RuntimeSettings};
use orchestrator::tools::ToolRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const HUB_SWEEP_MAX_PERIOD: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        model = %config.model.name,
        dispatch = config.runtime.dispatch.as_str(),
        "Configuration loaded"
    );

    let llm_config = RemoteLlmConfig::from_env(
        &config.model.api_key_env,
        &config.model.base_url,
        &config.model.name,
    )
    .with_context(|| format!("{} must hold the model API key", config.model.api_key_env))?
    .with_timeout(Duration::from_secs(config.model.timeout_secs));
    let model: Arc<dyn ChatModel> = Arc::new(OpenAiCompatClient::new(llm_config)?);

    let tools = ToolRegistry::standard(reqwest::Client::new());
    tracing::info!(tools = ?tools.tool_names(), "Tools registered");

    let checkpointer = open_checkpointer(&config).await?;

    let runtime = Arc::new(AgentRuntime::new(
        model,
        tools,
        checkpointer,
        RuntimeSettings::from(&config),
    )?);
    spawn_hub_sweeper(Arc::clone(&runtime));
    let app = create_router(runtime);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Starting orchestrator server");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Orchestrator server shut down gracefully");
    Ok(())
}

async fn open_checkpointer(config: &ServerConfig) -> anyhow::Result<Arc<dyn CheckpointSaver>> {
    let (Some(path), Some(url)) = (config.database.path.as_ref(), config.database_url()) else {
        tracing::warn!("No database configured, checkpoints are kept in memory");
        return Ok(Arc::new(InMemoryCheckpointSaver::new()));
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tracing::info!(path = %path.display(), "Opening checkpoint database");
    let db = DatabaseConnection::open(&url).await?;
    db.health_check().await?;
    Ok(Arc::new(SqliteCheckpointSaver::new(&db)))
}

/// Evicts finished event hubs even when no new runs arrive
fn spawn_hub_sweeper(runtime: Arc<AgentRuntime>) {
    let period = runtime
        .settings()
        .hub_retention
        .clamp(Duration::from_secs(1), HUB_SWEEP_MAX_PERIOD);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            runtime.prune_hubs();
        }
    });
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
