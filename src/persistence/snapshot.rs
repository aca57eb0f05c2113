use anyhow::{bail, Context};
use std::path::Path;

use crate::models::snapshot::{MetadataSnapshot, SNAPSHOT_VERSION};

/// Encoded to a staging file and renamed over `path`, so a reader never sees
/// a half-written snapshot.
pub fn save_snapshot(path: &Path, snapshot: &MetadataSnapshot) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let encoded = bincode::serialize(snapshot).context("Failed to encode snapshot")?;
    let staging = path.with_extension("bin.tmp");
    std::fs::write(&staging, &encoded)
        .with_context(|| format!("Failed to write {}", staging.display()))?;
    std::fs::rename(&staging, path)
        .with_context(|| format!("Failed to move snapshot into {}", path.display()))?;
    Ok(())
}

/// `None` only when no snapshot has been written yet.
///
/// A snapshot that exists but does not decode, or carries another version,
/// is an error: the WAL it superseded is gone, so booting without it would
/// lose every file.
pub fn load_snapshot(path: &Path) -> anyhow::Result<Option<MetadataSnapshot>> {
    let encoded = match std::fs::read(path) {
        Ok(encoded) => encoded,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()))
        }
    };

    let snapshot: MetadataSnapshot = bincode::deserialize(&encoded)
        .with_context(|| format!("Snapshot {} is corrupt", path.display()))?;

    if snapshot.version != SNAPSHOT_VERSION {
        bail!(
            "Snapshot {} has version {}, expected {}",
            path.display(),
            snapshot.version,
            SNAPSHOT_VERSION
        );
    }

    Ok(Some(snapshot))
}
