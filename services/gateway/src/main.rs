mod config;
mod error;
mod handlers;
mod models;
mod router;
mod state;

use config::GatewayConfig;
use matching_engine::Engine;
use router::create_router;
use state::AppState;
use std::sync::Arc;
use store::{JournalStore, MemoryStore, Store};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();

    tracing::info!("Starting order gateway");

    let config = GatewayConfig::from_env()?;

    let store: Arc<dyn Store> = match &config.journal_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "opening journal-backed store");
            Arc::new(JournalStore::open(path)?)
        }
        None => {
            tracing::warn!("JOURNAL_PATH not set; orders will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let engine = Arc::new(Engine::new(store));

    // Rebuild the in-memory books before accepting traffic.
    let loaded = {
        let engine = engine.clone();
        tokio::task::spawn_blocking(move || engine.recover()).await??
    };
    tracing::info!(loaded, "order books restored");

    let app = create_router(AppState::new(engine));

    let listener = TcpListener::bind(config.listen_addr).await?;
    tracing::info!("Listening on {}", config.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
