use anyhow::Context;
use filebox::background;
use filebox::config::AppConfig;
use filebox::routes;
use filebox::services::file_store::FileStore;
use filebox::services::store_actor::StoreHandle;
use filebox::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env();

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    tracing::info!("Starting filebox v{}", env!("CARGO_PKG_VERSION"));

    // Boot recovery: load snapshot, replay WAL, reconcile blobs
    let store = FileStore::open(&config)?;
    let (store_handle, store_task) = StoreHandle::spawn(store, config.store_mailbox_capacity);

    let state = AppState::new(config.clone(), store_handle);

    // Shutdown signal
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let snapshot_handle = tokio::spawn(background::snapshot_writer::run(
        state.clone(),
        shutdown_rx,
    ));

    let app = routes::build_router(state.clone());

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(max_upload_size = config.max_upload_size, "Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("Server error")?;

    tracing::info!("Waiting for background tasks to finish");
    let _ = snapshot_handle.await;

    tracing::info!("Writing final snapshot");
    background::snapshot_writer::write_snapshot(&state).await;

    // Dropping the last handle closes the mailbox and stops the store.
    drop(state);
    let _ = store_task.await;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal(shutdown_tx: tokio::sync::watch::Sender<bool>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install signal handler: {}", e);
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
    let _ = shutdown_tx.send(true);
}
