use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::file::StoredFile;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    pub version: u32,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub next_id: u64,
    pub last_upload_time: i64,
    pub files: BTreeMap<u64, StoredFile>,
}
