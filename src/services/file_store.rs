use anyhow::Context;
use bytes::Bytes;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::error::ServiceError;
use crate::models::file::{FileBlob, FileInfo, StoreStats, StoredFile};
use crate::models::snapshot::{MetadataSnapshot, SNAPSHOT_VERSION};
use crate::persistence::blobs::BlobDir;
use crate::persistence::snapshot::{load_snapshot, save_snapshot};
use crate::persistence::wal::{WalEntry, WalWriter};

/// The flat file collection: metadata in memory keyed by id, payloads on disk
/// under the same id, mutations journaled to the WAL before they become
/// visible.
///
/// Not synchronized. It is owned by a single task (see `store_actor`) which
/// applies one operation at a time.
pub struct FileStore {
    files: BTreeMap<u64, StoredFile>,
    blobs: BlobDir,
    wal: WalWriter,
    next_id: u64,
    last_upload_time: i64,
    max_upload_size: u64,
    snapshot_path: PathBuf,
    dirty: bool,
}

impl FileStore {
    /// Boot recovery: load the snapshot, replay the WAL on top of it, then
    /// reconcile metadata with the blobs actually present on disk.
    pub fn open(config: &AppConfig) -> anyhow::Result<Self> {
        let blobs = BlobDir::open(&config.blobs_dir()).context("Failed to create blobs dir")?;
        std::fs::create_dir_all(config.metadata_dir()).context("Failed to create metadata dir")?;
        let wal = WalWriter::open(&config.wal_dir()).context("Failed to open WAL")?;

        let mut store = Self {
            files: BTreeMap::new(),
            blobs,
            wal,
            next_id: 1,
            last_upload_time: 0,
            max_upload_size: config.max_upload_size,
            snapshot_path: config.snapshot_path(),
            dirty: false,
        };

        if let Some(snapshot) =
            load_snapshot(&store.snapshot_path).context("Failed to load snapshot")?
        {
            tracing::info!(
                files = snapshot.files.len(),
                "Loaded snapshot from {}",
                snapshot.timestamp
            );
            store.files = snapshot.files;
            store.next_id = snapshot.next_id.max(1);
            store.last_upload_time = snapshot.last_upload_time;
        }

        match WalWriter::read_entries(&config.wal_dir()) {
            Ok(entries) => {
                if !entries.is_empty() {
                    tracing::info!(count = entries.len(), "Replaying WAL entries");
                    store.replay(entries);
                }
            }
            Err(e) => {
                tracing::error!("Failed to read WAL entries: {}", e);
            }
        }

        if let Some(max_id) = store.files.keys().next_back() {
            store.next_id = store.next_id.max(max_id.saturating_add(1));
        }

        store.reconcile().context("Failed to reconcile blobs")?;

        // Fold the replayed WAL into a fresh snapshot.
        store.write_snapshot()?;

        Ok(store)
    }

    fn replay(&mut self, entries: Vec<WalEntry>) {
        self.dirty = true;
        for entry in entries {
            match entry {
                WalEntry::FileDeleted { id } => {
                    self.files.remove(&id);
                }
                uploaded @ WalEntry::FileUploaded { .. } => {
                    if let Some(file) = uploaded.into_stored_file() {
                        let id = file.info.id;
                        self.next_id = self.next_id.max(id.saturating_add(1));
                        self.last_upload_time = self.last_upload_time.max(file.info.upload_time);
                        self.files.insert(id, file);
                    }
                }
            }
        }
    }

    /// Drop metadata whose blob is missing or has the wrong length, and
    /// delete blob files nothing refers to. Ids found on disk are retired
    /// before any blob is removed.
    fn reconcile(&mut self) -> std::io::Result<()> {
        let broken: Vec<u64> = self
            .files
            .iter()
            .filter(|(id, file)| self.blobs.len_of(**id) != Some(file.info.size))
            .map(|(id, _)| *id)
            .collect();

        for id in broken {
            tracing::warn!(id, "Blob missing or truncated, removing metadata");
            self.files.remove(&id);
            self.dirty = true;
        }

        let on_disk = self.blobs.scan()?;
        if let Some(max_on_disk) = on_disk.iter().filter_map(|(id, _)| *id).max() {
            let floor = max_on_disk.saturating_add(1);
            if floor > self.next_id {
                self.next_id = floor;
                self.dirty = true;
            }
        }

        for (id, path) in on_disk {
            if id.is_some_and(|id| self.files.contains_key(&id)) {
                continue;
            }
            tracing::warn!(path = %path.display(), "Orphaned blob, removing");
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove orphaned blob");
            }
        }

        Ok(())
    }

    pub fn upload(&mut self, name: String, data: Bytes) -> Result<u64, ServiceError> {
        if name.is_empty() {
            return Err(ServiceError::Invalid("file name must not be empty".into()));
        }

        let size = data.len() as u64;
        if size > self.max_upload_size {
            return Err(ServiceError::TooLarge {
                size,
                limit: self.max_upload_size,
            });
        }

        let id = self.next_id;
        let next_id = id
            .checked_add(1)
            .ok_or_else(|| ServiceError::Storage("id space exhausted".into()))?;
        let upload_time = now_nanos().max(self.last_upload_time);
        let checksum = hex::encode(Sha256::digest(&data));

        self.blobs
            .write(id, &data)
            .map_err(|e| ServiceError::Storage(format!("blob write failed: {e}")))?;

        let file = StoredFile {
            info: FileInfo {
                id,
                name,
                size,
                upload_time,
            },
            checksum,
        };

        if let Err(e) = self.wal.append(&WalEntry::uploaded(&file)) {
            if let Err(e) = self.blobs.remove(id) {
                tracing::warn!(id, error = %e, "Failed to roll back blob");
            }
            return Err(ServiceError::Storage(format!("WAL write failed: {e}")));
        }

        self.next_id = next_id;
        self.last_upload_time = upload_time;
        self.files.insert(id, file);
        self.dirty = true;

        Ok(id)
    }

    /// All metadata records in ascending id order.
    pub fn list(&self) -> Vec<FileInfo> {
        self.files.values().map(|f| f.info.clone()).collect()
    }

    pub fn delete(&mut self, id: u64) -> Result<(), ServiceError> {
        if !self.files.contains_key(&id) {
            return Err(ServiceError::NotFound(id));
        }

        self.wal
            .append(&WalEntry::FileDeleted { id })
            .map_err(|e| ServiceError::Storage(format!("WAL write failed: {e}")))?;

        self.files.remove(&id);
        self.dirty = true;

        // A leftover blob is swept as an orphan on the next boot.
        if let Err(e) = self.blobs.remove(id) {
            tracing::warn!(id, error = %e, "Failed to remove blob");
        }

        Ok(())
    }

    /// Metadata and payload for one file. The payload is checked against the
    /// recorded SHA-256.
    pub fn fetch(&self, id: u64) -> Result<(StoredFile, FileBlob), ServiceError> {
        let file = self.files.get(&id).ok_or(ServiceError::NotFound(id))?;

        let blob = self
            .blobs
            .read(id)
            .map_err(|e| ServiceError::Storage(format!("blob read failed: {e}")))?;

        if hex::encode(Sha256::digest(&blob.bytes)) != file.checksum {
            tracing::error!(id, "Blob checksum mismatch");
            return Err(ServiceError::Storage(format!("blob {id} is corrupt")));
        }

        Ok((file.clone(), blob))
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            file_count: self.files.len(),
            total_size_bytes: self.files.values().map(|f| f.info.size).sum(),
            next_id: self.next_id,
        }
    }

    /// Persist all metadata and truncate the WAL. Returns `false` when nothing
    /// changed since the last snapshot.
    pub fn write_snapshot(&mut self) -> anyhow::Result<bool> {
        if !self.dirty && self.snapshot_path.exists() {
            return Ok(false);
        }

        let snapshot = MetadataSnapshot {
            version: SNAPSHOT_VERSION,
            timestamp: Utc::now(),
            next_id: self.next_id,
            last_upload_time: self.last_upload_time,
            files: self.files.clone(),
        };

        save_snapshot(&self.snapshot_path, &snapshot).context("Failed to write snapshot")?;
        self.wal.truncate().context("Failed to truncate WAL")?;
        self.dirty = false;
        tracing::info!(files = self.files.len(), "Snapshot written successfully");
        Ok(true)
    }
}

fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}
