use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::file::{FileInfo, StoredFile};

const WAL_FILE: &str = "current.wal";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum WalEntry {
    FileUploaded {
        id: u64,
        name: String,
        size: u64,
        upload_time: i64,
        checksum: String,
    },
    FileDeleted {
        id: u64,
    },
}

impl WalEntry {
    pub fn uploaded(file: &StoredFile) -> Self {
        WalEntry::FileUploaded {
            id: file.info.id,
            name: file.info.name.clone(),
            size: file.info.size,
            upload_time: file.info.upload_time,
            checksum: file.checksum.clone(),
        }
    }

    pub fn into_stored_file(self) -> Option<StoredFile> {
        match self {
            WalEntry::FileUploaded {
                id,
                name,
                size,
                upload_time,
                checksum,
            } => Some(StoredFile {
                info: FileInfo {
                    id,
                    name,
                    size,
                    upload_time,
                },
                checksum,
            }),
            WalEntry::FileDeleted { .. } => None,
        }
    }
}

/// Append-only log of metadata mutations since the last snapshot. Records are
/// a little-endian `u32` length followed by a bincode-encoded [`WalEntry`].
pub struct WalWriter {
    dir: PathBuf,
    file: std::fs::File,
}

impl WalWriter {
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(WAL_FILE))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            file,
        })
    }

    pub fn append(&mut self, entry: &WalEntry) -> anyhow::Result<()> {
        let data = bincode::serialize(entry)?;
        let len = u32::try_from(data.len())?;
        self.file.write_all(&len.to_le_bytes())?;
        self.file.write_all(&data)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn truncate(&mut self) -> anyhow::Result<()> {
        self.file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.dir.join(WAL_FILE))?;
        Ok(())
    }

    pub fn read_entries(dir: &Path) -> anyhow::Result<Vec<WalEntry>> {
        let wal_path = dir.join(WAL_FILE);
        if !wal_path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read(&wal_path)?;
        let mut entries = Vec::new();
        let mut cursor = 0;
        while cursor + 4 <= data.len() {
            let mut len_bytes = [0u8; 4];
            len_bytes.copy_from_slice(&data[cursor..cursor + 4]);
            let len = u32::from_le_bytes(len_bytes) as usize;
            cursor += 4;
            if cursor + len > data.len() {
                tracing::warn!("WAL truncated at entry boundary, stopping replay");
                break;
            }
            match bincode::deserialize::<WalEntry>(&data[cursor..cursor + len]) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!("WAL entry corrupt, stopping replay: {}", e);
                    break;
                }
            }
            cursor += len;
        }
        Ok(entries)
    }
}
