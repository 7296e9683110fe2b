// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use axum::{
    Router,
    routing::{get, post},
};
use rolechat_agent::ChatOrchestrator;
use rolechat_core::RolechatError;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Health state for the unauthenticated health endpoint.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            start_time: std::time::Instant::now(),
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Runs one turn per chat request.
    pub orchestrator: ChatOrchestrator,
    pub health: HealthState,
}

impl GatewayState {
    pub fn new(orchestrator: ChatOrchestrator) -> Self {
        Self {
            orchestrator,
            health: HealthState::new(),
        }
    }
}

/// Gateway server configuration (mirrors `[server]` from rolechat-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Build the gateway router:
/// - POST /v1/chat/send
/// - GET /health
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/v1/chat/send", post(handlers::post_chat_send))
        .route("/health", get(handlers::get_health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Start the gateway HTTP server.
///
/// Serves until `shutdown` is cancelled, then stops accepting connections
/// and waits for open responses to end. Open turn streams end on their own
/// once the shutdown cancels their turns.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), RolechatError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RolechatError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| RolechatError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("Gateway server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
        assert!(debug.contains("3000"));
    }

    #[test]
    fn health_state_tracks_start_time() {
        let health = HealthState::default();
        assert!(health.start_time.elapsed().as_secs() < 5);
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: taken.local_addr().unwrap().port(),
        };
        let harness = rolechat_test_utils::TurnHarness::builder().build().await.unwrap();
        let state = GatewayState::new(harness.orchestrator.clone());
        let err = start_server(&config, state, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to bind"));
    }
}
