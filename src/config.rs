use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: String,
    /// Largest payload `upload` accepts, in bytes.
    pub max_upload_size: u64,
    pub snapshot_interval_secs: u64,
    pub store_mailbox_capacity: usize,
    pub log_level: String,
    pub cors_allowed_origins: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_env("PORT", 8080),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "./data".into()),
            max_upload_size: parse_env("MAX_UPLOAD_SIZE", 2_097_152),
            snapshot_interval_secs: parse_env("SNAPSHOT_INTERVAL_SECS", 300),
            store_mailbox_capacity: parse_env("STORE_MAILBOX_CAPACITY", 64),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".into()),
        }
    }

    /// Body limit enforced by the HTTP layer. Kept above `max_upload_size` so
    /// payloads just over the cap still reach the store and get a `TooLarge`
    /// answer instead of a bare 413.
    pub fn request_body_limit(&self) -> usize {
        usize::try_from(self.max_upload_size.saturating_mul(2)).unwrap_or(usize::MAX)
    }

    pub fn blobs_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("blobs")
    }

    pub fn metadata_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("metadata")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.metadata_dir().join("snapshot.bin")
    }

    pub fn wal_dir(&self) -> PathBuf {
        self.metadata_dir().join("wal")
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
