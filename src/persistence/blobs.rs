use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::models::file::FileBlob;

/// Payload files, one per id, under a single flat directory.
#[derive(Debug, Clone)]
pub struct BlobDir {
    root: PathBuf,
}

impl BlobDir {
    pub fn open(root: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn path_for(&self, id: u64) -> PathBuf {
        self.root.join(format!("{id}.bin"))
    }

    /// Write through a temp file so a crash never leaves a partial blob under
    /// a real id.
    pub fn write(&self, id: u64, data: &[u8]) -> std::io::Result<()> {
        let path = self.path_for(id);
        let tmp_path = path.with_extension("bin.tmp");
        std::fs::write(&tmp_path, data)?;
        std::fs::rename(&tmp_path, &path)
    }

    pub fn read(&self, id: u64) -> std::io::Result<FileBlob> {
        let data = std::fs::read(self.path_for(id))?;
        Ok(FileBlob {
            id,
            bytes: Bytes::from(data),
        })
    }

    pub fn remove(&self, id: u64) -> std::io::Result<()> {
        match std::fs::remove_file(self.path_for(id)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Length of the blob on disk, or `None` if it is missing.
    pub fn len_of(&self, id: u64) -> Option<u64> {
        std::fs::metadata(self.path_for(id)).ok().map(|m| m.len())
    }

    /// Every blob file on disk as `(id, path)`. Leftover temp files and
    /// foreign names come back with `None` ids so callers can sweep them.
    pub fn scan(&self) -> std::io::Result<Vec<(Option<u64>, PathBuf)>> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            let id = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(".bin"))
                .and_then(|stem| stem.parse::<u64>().ok());
            found.push((id, path));
        }
        Ok(found)
    }
}
