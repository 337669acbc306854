//! Listener setup and the serve loop.
//!
//! Binding is split from serving so the binary can fail fast on a bad
//! address before storage is touched, and can release the database pool
//! once [`serve`] returns.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Address the API listens on.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host or IP literal, e.g. `0.0.0.0`.
    pub host: String,
    /// TCP port; `0` lets the OS pick one.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8000,
        }
    }
}

/// Parse the configured address and open the listener.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address {}: {e}", config.host)))?;

    TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))
}

/// Serve the API on `listener` until `shutdown` resolves.
///
/// In-flight requests are drained before this returns.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("listener has no address: {e}")))?;
    info!(addr = %local, "LEWAS API listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve(e.to_string()))?;

    info!(addr = %local, "LEWAS API stopped");
    Ok(())
}

/// Resolves on `Ctrl-C`.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

/// Listener and serve-loop failures.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The address was invalid or could not be bound.
    #[error("bind error: {0}")]
    Bind(String),

    /// The serve loop failed.
    #[error("serve error: {0}")]
    Serve(String),
}
