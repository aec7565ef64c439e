//! HTTP server lifecycle.
//!
//! Provides [`start_server`] which binds to the configured address and
//! serves the router until `Ctrl-C` is received.

use std::net::SocketAddr;
use std::sync::Arc;

use socialsim_core::TextGenerator;
use socialsim_core::config::ServerConfig;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::router::build_router;
use crate::state::AppState;

/// Start the HTTP server.
///
/// Binds to the configured address, builds the router, and serves
/// requests until `Ctrl-C`. A running simulation is stopped on the way
/// out.
///
/// # Errors
///
/// Returns an error if the address is invalid, the TCP listener cannot
/// bind, or the server encounters a fatal I/O error.
pub async fn start_server<G: TextGenerator>(
    config: &ServerConfig,
    state: Arc<AppState<G>>,
) -> Result<(), ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let simulation = Arc::clone(&state.simulation);
    let router = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, "SocialSim server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    simulation.stop();
    info!("SocialSim server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}
