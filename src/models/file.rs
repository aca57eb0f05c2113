use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Metadata describing a stored file. This is what `list` returns; it never
/// carries the payload.
///
/// Ids and sizes are `u64`, so the contract's unbounded naturals are capped at
/// `u64::MAX`. `upload_time` is nanoseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub id: u64,
    pub name: String,
    pub size: u64,
    pub upload_time: i64,
}

/// Metadata plus the SHA-256 of the payload, as the store keeps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub info: FileInfo,
    pub checksum: String,
}

/// Payload bytes of a stored file, addressed by the same id as its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    pub id: u64,
    pub bytes: Bytes,
}

/// Tagged outcome of a contract call: `{"ok": value}` or `{"err": "message"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcResult<T> {
    Ok(T),
    Err(String),
}

impl<T> RpcResult<T> {
    pub fn into_result(self) -> Result<T, String> {
        match self {
            RpcResult::Ok(v) => Ok(v),
            RpcResult::Err(e) => Err(e),
        }
    }
}

impl<T> From<Result<T, ServiceError>> for RpcResult<T> {
    fn from(result: Result<T, ServiceError>) -> Self {
        match result {
            Ok(v) => RpcResult::Ok(v),
            Err(e) => RpcResult::Err(e.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub file_count: usize,
    pub total_size_bytes: u64,
    pub next_id: u64,
}
