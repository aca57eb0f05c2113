use crate::state::AppState;
use std::time::Duration;
use tokio::sync::watch;

pub async fn run(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let interval = Duration::from_secs(state.config.snapshot_interval_secs.max(1));

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {
                tracing::info!("Snapshot writer shutting down");
                return;
            }
        }

        write_snapshot(&state).await;
    }
}

pub async fn write_snapshot(state: &AppState) {
    match state.store.snapshot().await {
        Ok(true) => {}
        Ok(false) => tracing::debug!("No changes since last snapshot"),
        Err(e) => tracing::error!("Failed to write snapshot: {:#}", e),
    }
}
