use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{AppError, ServiceError};
use crate::models::file::{FileBlob, FileInfo, StoreStats, StoredFile};
use crate::services::file_store::FileStore;

pub enum StoreCommand {
    Upload {
        name: String,
        data: Bytes,
        reply: oneshot::Sender<Result<u64, ServiceError>>,
    },
    List {
        reply: oneshot::Sender<Vec<FileInfo>>,
    },
    Delete {
        id: u64,
        reply: oneshot::Sender<Result<(), ServiceError>>,
    },
    Fetch {
        id: u64,
        reply: oneshot::Sender<Result<(StoredFile, FileBlob), ServiceError>>,
    },
    Stats {
        reply: oneshot::Sender<StoreStats>,
    },
    Snapshot {
        reply: oneshot::Sender<anyhow::Result<bool>>,
    },
}

/// Cloneable mailbox address of the store actor.
///
/// The actor runs on its own blocking thread and handles one command at a
/// time, so every operation is linearizable with respect to the others. The
/// outer `Result` of each method only fails when the actor is gone; the inner
/// one is the operation's own outcome.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    /// Must be called from within a tokio runtime. The actor stops once every
    /// handle has been dropped.
    pub fn spawn(store: FileStore, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let task = tokio::task::spawn_blocking(move || run(store, rx));
        (Self { tx }, task)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> StoreCommand,
    ) -> Result<T, AppError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| AppError::Unavailable("file store is not running".into()))?;
        response
            .await
            .map_err(|_| AppError::Unavailable("file store dropped the request".into()))
    }

    pub async fn upload(
        &self,
        name: String,
        data: Bytes,
    ) -> Result<Result<u64, ServiceError>, AppError> {
        self.request(|reply| StoreCommand::Upload { name, data, reply })
            .await
    }

    pub async fn list(&self) -> Result<Vec<FileInfo>, AppError> {
        self.request(|reply| StoreCommand::List { reply }).await
    }

    pub async fn delete(&self, id: u64) -> Result<Result<(), ServiceError>, AppError> {
        self.request(|reply| StoreCommand::Delete { id, reply }).await
    }

    pub async fn fetch(
        &self,
        id: u64,
    ) -> Result<Result<(StoredFile, FileBlob), ServiceError>, AppError> {
        self.request(|reply| StoreCommand::Fetch { id, reply }).await
    }

    pub async fn stats(&self) -> Result<StoreStats, AppError> {
        self.request(|reply| StoreCommand::Stats { reply }).await
    }

    pub async fn snapshot(&self) -> anyhow::Result<bool> {
        self.request(|reply| StoreCommand::Snapshot { reply }).await?
    }
}

fn run(mut store: FileStore, mut rx: mpsc::Receiver<StoreCommand>) {
    tracing::info!("File store started");

    // A send error means the caller went away; the operation still happened.
    while let Some(command) = rx.blocking_recv() {
        match command {
            StoreCommand::Upload { name, data, reply } => {
                let result = store.upload(name.clone(), data);
                match &result {
                    Ok(id) => tracing::info!(id, name = %name, "File uploaded"),
                    Err(e) => log_rejection("upload", e),
                }
                let _ = reply.send(result);
            }
            StoreCommand::List { reply } => {
                let _ = reply.send(store.list());
            }
            StoreCommand::Delete { id, reply } => {
                let result = store.delete(id);
                match &result {
                    Ok(()) => tracing::info!(id, "File deleted"),
                    Err(e) => log_rejection("delete", e),
                }
                let _ = reply.send(result);
            }
            StoreCommand::Fetch { id, reply } => {
                let _ = reply.send(store.fetch(id));
            }
            StoreCommand::Stats { reply } => {
                let _ = reply.send(store.stats());
            }
            StoreCommand::Snapshot { reply } => {
                let _ = reply.send(store.write_snapshot());
            }
        }
    }

    tracing::info!("File store stopped");
}

fn log_rejection(operation: &str, error: &ServiceError) {
    match error {
        ServiceError::Storage(_) => tracing::error!(operation, error = %error, "Store operation failed"),
        _ => tracing::warn!(operation, error = %error, "Store operation rejected"),
    }
}
