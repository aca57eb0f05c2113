//! Client side of the file contract: a typed HTTP client plus the small amount
//! of state a front-end keeps between calls.

use anyhow::Context;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::CONTENT_TYPE;
use std::path::Path;

use crate::models::file::{FileInfo, RpcResult};

/// Typed client for the `/api/v1/files` surface.
///
/// Logical refusals come back as `Ok(Err(message))`; transport failures
/// (connection, HTTP status, decoding) as the outer error. Nothing is retried.
#[derive(Clone)]
pub struct FileboxClient {
    http: reqwest::Client,
    base_url: String,
}

impl FileboxClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn upload_file(&self, name: &str, data: Vec<u8>) -> anyhow::Result<Result<u64, String>> {
        let result: RpcResult<u64> = self
            .http
            .post(self.url("/api/v1/files"))
            .query(&[("name", name)])
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await
            .context("Failed to send upload request")?
            .error_for_status()
            .context("Upload request failed")?
            .json()
            .await
            .context("Failed to parse upload response")?;
        Ok(result.into_result())
    }

    pub async fn list_files(&self) -> anyhow::Result<Vec<FileInfo>> {
        self.http
            .get(self.url("/api/v1/files"))
            .send()
            .await
            .context("Failed to send list request")?
            .error_for_status()
            .context("List request failed")?
            .json()
            .await
            .context("Failed to parse file listing")
    }

    pub async fn delete_file(&self, id: u64) -> anyhow::Result<Result<(), String>> {
        let result: RpcResult<()> = self
            .http
            .delete(self.url(&format!("/api/v1/files/{}", id)))
            .send()
            .await
            .context("Failed to send delete request")?
            .error_for_status()
            .context("Delete request failed")?
            .json()
            .await
            .context("Failed to parse delete response")?;
        Ok(result.into_result())
    }

    pub async fn download_file(&self, id: u64) -> anyhow::Result<Bytes> {
        self.http
            .get(self.url(&format!("/api/v1/files/{}", id)))
            .send()
            .await
            .context("Failed to send download request")?
            .error_for_status()
            .context("Download request failed")?
            .bytes()
            .await
            .context("Failed to read download body")
    }
}

/// The contract-facing part of a front-end: the last listing it rendered and
/// a transient notice for the most recent failure.
///
/// Every action re-fetches the listing afterwards, success or not, so the view
/// converges with the server. Taking `&mut self` keeps at most one upload in
/// flight.
pub struct ClientShell {
    client: FileboxClient,
    files: Vec<FileInfo>,
    notice: Option<String>,
}

impl ClientShell {
    pub fn new(client: FileboxClient) -> Self {
        Self {
            client,
            files: Vec::new(),
            notice: None,
        }
    }

    /// Current listing, newest upload first.
    pub fn files(&self) -> &[FileInfo] {
        &self.files
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub async fn refresh(&mut self) {
        match self.client.list_files().await {
            Ok(mut files) => {
                files.sort_by(|a, b| b.id.cmp(&a.id));
                self.files = files;
            }
            Err(e) => self.notify(format!("Failed to fetch files: {:#}", e)),
        }
    }

    /// Read a local file fully into memory and upload it under its file name.
    pub async fn submit_path(&mut self, path: &Path) -> Option<u64> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let outcome = match tokio::fs::read(path).await {
            Ok(data) => self.client.upload_file(&name, data).await,
            Err(e) => Err(anyhow::Error::new(e).context(format!("Failed to read {}", path.display()))),
        };

        let id = match outcome {
            Ok(Ok(id)) => Some(id),
            Ok(Err(message)) => {
                self.notify(message);
                None
            }
            Err(e) => {
                self.notify(format!("Failed to upload file: {:#}", e));
                None
            }
        };

        self.refresh().await;
        id
    }

    pub async fn delete(&mut self, id: u64) -> bool {
        let deleted = match self.client.delete_file(id).await {
            Ok(Ok(())) => true,
            Ok(Err(message)) => {
                self.notify(message);
                false
            }
            Err(e) => {
                self.notify(format!("Failed to delete file: {:#}", e));
                false
            }
        };

        self.refresh().await;
        deleted
    }

    fn notify(&mut self, message: String) {
        tracing::warn!(notice = %message, "Client action failed");
        self.notice = Some(message);
    }
}

/// Human-readable size with two decimals above 1 KB. Works on the integer so
/// large values keep their precision.
pub fn format_size(size: u64) -> String {
    const KB: u128 = 1024;
    const MB: u128 = 1024 * 1024;

    let size = size as u128;
    let (unit, divisor) = match size {
        s if s < KB => return format!("{} B", s),
        s if s < MB => ("KB", KB),
        _ => ("MB", MB),
    };
    let hundredths = (size * 100 + divisor / 2) / divisor;
    format!("{}.{:02} {}", hundredths / 100, hundredths % 100, unit)
}

/// `uploadTime` (ns since epoch) as an RFC 3339 UTC timestamp.
pub fn format_upload_time(upload_time: i64) -> String {
    DateTime::<Utc>::from_timestamp_nanos(upload_time).to_rfc3339_opts(SecondsFormat::Secs, true)
}
