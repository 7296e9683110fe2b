// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `rolechat serve` command implementation.
//!
//! Opens SQLite storage, builds the OpenAI-compatible provider and the
//! turn collaborators, starts the gateway and runs until SIGINT/SIGTERM.
//! On shutdown the server stops accepting connections, in-flight turns are
//! cancelled and drained, and the WAL is checkpointed.

use std::sync::Arc;
use std::time::Duration;

use rolechat_agent::{
    ChatOrchestrator, ConfigCharacterStore, FixedWindowRateLimiter, KeywordSafetyChecker,
    TurnSettings, shutdown,
};
use rolechat_config::RolechatConfig;
use rolechat_core::{RolechatError, StorageAdapter};
use rolechat_gateway::{GatewayState, ServerConfig};
use rolechat_openai::OpenAiProvider;
use rolechat_storage::SqliteStorage;
use tracing::{info, warn};

/// How long cancelled turns get to record their outcome.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the server until a shutdown signal arrives.
pub async fn run_serve(config: RolechatConfig) -> Result<(), RolechatError> {
    init_tracing(&config.server.log_level);

    info!("starting rolechat serve");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    info!(path = %config.storage.database_path, "storage initialized");

    let provider = Arc::new(OpenAiProvider::new(&config.provider)?);
    info!(
        base_url = %config.provider.base_url,
        model = %config.provider.model,
        "provider ready"
    );

    let characters = Arc::new(ConfigCharacterStore::new(
        &config.characters,
        &config.chat.default_system_prompt,
    ));
    if characters.is_empty() {
        warn!("no characters configured, new conversations will be rejected");
    } else {
        info!(count = characters.len(), "characters loaded");
    }

    let cancel = shutdown::install_signal_handler();

    let orchestrator = ChatOrchestrator::builder(storage.clone(), provider, characters)
        .safety(Arc::new(KeywordSafetyChecker::from_config(&config.safety)))
        .rate_limiter(Arc::new(FixedWindowRateLimiter::from_config(
            &config.rate_limit,
        )))
        .settings(TurnSettings::from_config(&config.chat))
        .shutdown_token(cancel.clone())
        .build();

    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let served = rolechat_gateway::start_server(
        &server_config,
        GatewayState::new(orchestrator.clone()),
        cancel.clone(),
    )
    .await;

    // The server also returns on bind or accept failure; stop the turns either way.
    cancel.cancel();
    if !shutdown::drain_turns(&orchestrator, DRAIN_TIMEOUT).await {
        warn!("shutting down with turns still running");
    }

    if let Err(e) = storage.close().await {
        warn!(error = %e, "storage close failed");
    }

    served?;
    info!("rolechat serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rolechat={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
