#![allow(dead_code)]

use filebox::config::AppConfig;
use filebox::services::file_store::FileStore;
use filebox::services::store_actor::StoreHandle;
use filebox::state::AppState;

pub const TEST_MAX_UPLOAD: u64 = 4096;

pub fn test_config(data_dir: &str) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        data_dir: data_dir.to_string(),
        max_upload_size: TEST_MAX_UPLOAD,
        snapshot_interval_secs: 3600,
        store_mailbox_capacity: 16,
        log_level: "error".to_string(),
        cors_allowed_origins: "*".to_string(),
    }
}

/// Needs a tokio runtime: the store actor is spawned on the blocking pool.
pub fn setup() -> (AppState, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let config = test_config(tmp.path().to_str().unwrap());
    let store = FileStore::open(&config).unwrap();
    let (handle, _task) = StoreHandle::spawn(store, config.store_mailbox_capacity);
    (AppState::new(config, handle), tmp)
}
