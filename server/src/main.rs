use std::net::SocketAddr;

use tracing::{error, info, warn};

use awbtrack::logging::init_logging;
use awbtrack_server::{app, config, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    // --- Configuration & logging ---
    let (config, source) = config::resolve_config()?;
    init_logging(&config.logging)?;
    match &source {
        Some(path) => info!(path = %path.display(), "Loaded configuration"),
        None => info!("No config file found, using defaults"),
    }

    // --- Engine ---
    let state = AppState::build(config)?;
    let recovered = state.engine.recover_interrupted().await?;
    if !recovered.is_empty() {
        warn!(count = recovered.len(), jobs = ?recovered, "Marked interrupted jobs as failed");
    }

    // --- Start server ---
    let addr = SocketAddr::new(
        state.config.server.host.parse()?,
        state.config.server.port,
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Starting server");

    axum::serve(listener, app(state.clone()))
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    info!("Graceful shutdown complete");
    Ok(())
}

/// Waits for SIGINT or SIGTERM, then stops every job and closes the event
/// streams so open WebSocket connections end before the server drains.
async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl-C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT (Ctrl-C), starting graceful shutdown"),
        () = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }

    state.engine.shutdown().await;
    let closed = state.broadcaster.close_all();
    info!(closed, "Closed WebSocket event streams");
}
