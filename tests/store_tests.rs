mod common;

use bytes::Bytes;
use common::{test_config, TEST_MAX_UPLOAD};
use filebox::config::AppConfig;
use filebox::error::ServiceError;
use filebox::models::file::FileInfo;
use filebox::models::snapshot::{MetadataSnapshot, SNAPSHOT_VERSION};
use filebox::persistence::snapshot::save_snapshot;
use filebox::services::file_store::FileStore;
use std::io::Write;

fn open_store() -> (FileStore, AppConfig, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let config = test_config(tmp.path().to_str().unwrap());
    let store = FileStore::open(&config).unwrap();
    (store, config, tmp)
}

fn ids(files: &[FileInfo]) -> Vec<u64> {
    files.iter().map(|f| f.id).collect()
}

// ==================== Scenarios ====================

#[test]
fn test_upload_list_delete_scenario() {
    let (mut store, _config, _tmp) = open_store();

    // S1
    let id = store.upload("a.txt".into(), Bytes::from_static(b"hi")).unwrap();
    assert_eq!(id, 1);
    let files = store.list();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].id, 1);
    assert_eq!(files[0].name, "a.txt");
    assert_eq!(files[0].size, 2);

    // S2
    let id = store.upload("b.bin".into(), Bytes::from(vec![0u8; 1024])).unwrap();
    assert_eq!(id, 2);
    let files = store.list();
    assert_eq!(ids(&files), vec![1, 2]);
    assert_eq!(files.iter().map(|f| f.size).collect::<Vec<_>>(), vec![2, 1024]);

    // S3
    store.delete(1).unwrap();
    assert_eq!(ids(&store.list()), vec![2]);

    // S4
    let before = store.list();
    assert_eq!(store.delete(1), Err(ServiceError::NotFound(1)));
    assert_eq!(ServiceError::NotFound(1).to_string(), "file 1 not found");
    assert_eq!(store.list(), before);

    // S5
    let id = store.upload("a.txt".into(), Bytes::from_static(b"hi")).unwrap();
    assert_eq!(id, 3);
    assert_eq!(ids(&store.list()), vec![2, 3]);
}

#[test]
fn test_duplicate_names_get_distinct_ids() {
    let (mut store, _config, _tmp) = open_store();

    let first = store.upload("dup".into(), Bytes::from_static(b"x")).unwrap();
    let second = store.upload("dup".into(), Bytes::from_static(b"yz")).unwrap();
    assert_ne!(first, second);

    let files = store.list();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.name == "dup"));
    assert_eq!(files.iter().map(|f| f.size).collect::<Vec<_>>(), vec![1, 2]);
}

// ==================== Properties ====================

#[test]
fn test_ids_strictly_increase() {
    let (mut store, _config, _tmp) = open_store();

    let mut returned = Vec::new();
    for i in 0..20 {
        let id = store
            .upload(format!("file-{i}"), Bytes::from(vec![b'a'; i]))
            .unwrap();
        returned.push(id);
        if i % 3 == 0 {
            store.delete(id).unwrap();
        }
    }

    assert!(returned.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_upload_records_name_and_size() {
    let (mut store, _config, _tmp) = open_store();

    let name = "  Résumé (final) v2.PDF  ";
    let id = store.upload(name.into(), Bytes::from(vec![7u8; 300])).unwrap();

    let matching: Vec<FileInfo> = store.list().into_iter().filter(|f| f.id == id).collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].name, name);
    assert_eq!(matching[0].size, 300);
}

#[test]
fn test_upload_times_never_decrease() {
    let (mut store, _config, _tmp) = open_store();

    for i in 0..10 {
        store.upload(format!("f{i}"), Bytes::from_static(b"x")).unwrap();
    }

    let times: Vec<i64> = store.list().iter().map(|f| f.upload_time).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
    assert!(times[0] > 0);
}

#[test]
fn test_list_is_stable_without_mutation() {
    let (mut store, _config, _tmp) = open_store();
    store.upload("one".into(), Bytes::from_static(b"1")).unwrap();
    store.upload("two".into(), Bytes::from_static(b"22")).unwrap();

    assert_eq!(store.list(), store.list());
}

#[test]
fn test_delete_removes_exactly_one() {
    let (mut store, _config, _tmp) = open_store();
    for name in ["a", "b", "c"] {
        store.upload(name.into(), Bytes::from_static(b"data")).unwrap();
    }
    let before = store.list();

    store.delete(2).unwrap();

    let after = store.list();
    assert_eq!(after.len(), before.len() - 1);
    assert!(after.iter().all(|f| f.id != 2));
    assert_eq!(after[0], before[0]);
    assert_eq!(after[1], before[2]);
}

#[test]
fn test_delete_twice_reports_not_found() {
    let (mut store, _config, _tmp) = open_store();
    let id = store.upload("once".into(), Bytes::from_static(b"x")).unwrap();

    assert_eq!(store.delete(id), Ok(()));
    assert_eq!(store.delete(id), Err(ServiceError::NotFound(id)));
    assert!(store.list().is_empty());
}

// ==================== Validation ====================

#[test]
fn test_empty_name_is_invalid() {
    let (mut store, _config, _tmp) = open_store();

    let err = store.upload(String::new(), Bytes::from_static(b"x")).unwrap_err();
    assert!(matches!(err, ServiceError::Invalid(_)));
    assert!(store.list().is_empty());
}

#[test]
fn test_payload_over_limit_is_too_large() {
    let (mut store, _config, _tmp) = open_store();

    let err = store
        .upload("big".into(), Bytes::from(vec![0u8; TEST_MAX_UPLOAD as usize + 1]))
        .unwrap_err();
    assert_eq!(
        err,
        ServiceError::TooLarge {
            size: TEST_MAX_UPLOAD + 1,
            limit: TEST_MAX_UPLOAD,
        }
    );
    assert!(store.list().is_empty());

    // A refused upload does not consume an id.
    let id = store
        .upload("fits".into(), Bytes::from(vec![0u8; TEST_MAX_UPLOAD as usize]))
        .unwrap();
    assert_eq!(id, 1);
}

#[test]
fn test_empty_payload_is_accepted() {
    let (mut store, _config, _tmp) = open_store();

    let id = store.upload("empty".into(), Bytes::new()).unwrap();
    assert_eq!(store.list()[0].size, 0);

    let (_, blob) = store.fetch(id).unwrap();
    assert!(blob.bytes.is_empty());
}

// ==================== Fetch ====================

#[test]
fn test_fetch_returns_payload_and_checksum() {
    let (mut store, _config, _tmp) = open_store();
    let id = store.upload("hello.txt".into(), Bytes::from_static(b"hello world")).unwrap();

    let (file, blob) = store.fetch(id).unwrap();
    assert_eq!(blob.id, id);
    assert_eq!(blob.bytes, Bytes::from_static(b"hello world"));
    assert_eq!(
        file.checksum,
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
    );

    assert_eq!(store.fetch(99).unwrap_err(), ServiceError::NotFound(99));
}

#[test]
fn test_fetch_detects_corrupt_blob() {
    let (mut store, config, _tmp) = open_store();
    let id = store.upload("c.txt".into(), Bytes::from_static(b"abc")).unwrap();

    std::fs::write(config.blobs_dir().join(format!("{id}.bin")), b"xyz").unwrap();

    assert!(matches!(store.fetch(id), Err(ServiceError::Storage(_))));
}

#[test]
fn test_stats_track_count_and_bytes() {
    let (mut store, _config, _tmp) = open_store();
    store.upload("a".into(), Bytes::from_static(b"12")).unwrap();
    store.upload("b".into(), Bytes::from_static(b"345")).unwrap();
    store.delete(1).unwrap();

    let stats = store.stats();
    assert_eq!(stats.file_count, 1);
    assert_eq!(stats.total_size_bytes, 3);
    assert_eq!(stats.next_id, 3);
}

// ==================== Recovery ====================

#[test]
fn test_restart_replays_wal() {
    let (mut store, config, _tmp) = open_store();
    store.upload("a.txt".into(), Bytes::from_static(b"hi")).unwrap();
    store.upload("b.txt".into(), Bytes::from_static(b"there")).unwrap();
    store.delete(1).unwrap();
    let before = store.list();
    drop(store);

    let store = FileStore::open(&config).unwrap();
    assert_eq!(store.list(), before);

    let (_, blob) = store.fetch(2).unwrap();
    assert_eq!(blob.bytes, Bytes::from_static(b"there"));
}

#[test]
fn test_ids_not_reused_after_restart() {
    let (mut store, config, _tmp) = open_store();
    store.upload("a".into(), Bytes::from_static(b"1")).unwrap();
    store.upload("b".into(), Bytes::from_static(b"2")).unwrap();
    store.delete(2).unwrap();
    drop(store);

    let mut store = FileStore::open(&config).unwrap();
    let id = store.upload("c".into(), Bytes::from_static(b"3")).unwrap();
    assert_eq!(id, 3);
}

#[test]
fn test_snapshot_truncates_wal_and_restores() {
    let (mut store, config, _tmp) = open_store();
    store.upload("a".into(), Bytes::from_static(b"1")).unwrap();
    store.upload("b".into(), Bytes::from_static(b"2")).unwrap();
    store.delete(2).unwrap();

    assert!(store.write_snapshot().unwrap());
    assert!(!store.write_snapshot().unwrap());

    let wal_len = std::fs::metadata(config.wal_dir().join("current.wal")).unwrap().len();
    assert_eq!(wal_len, 0);
    assert!(config.snapshot_path().exists());

    let before = store.list();
    drop(store);

    let mut store = FileStore::open(&config).unwrap();
    assert_eq!(store.list(), before);
    assert_eq!(store.upload("c".into(), Bytes::from_static(b"3")).unwrap(), 3);
}

#[test]
fn test_truncated_wal_tail_is_ignored() {
    let (mut store, config, _tmp) = open_store();
    store.upload("kept".into(), Bytes::from_static(b"ok")).unwrap();
    drop(store);

    let mut wal = std::fs::OpenOptions::new()
        .append(true)
        .open(config.wal_dir().join("current.wal"))
        .unwrap();
    wal.write_all(&200u32.to_le_bytes()).unwrap();
    wal.write_all(b"partial").unwrap();
    drop(wal);

    let store = FileStore::open(&config).unwrap();
    let files = store.list();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "kept");
}

#[test]
fn test_missing_blob_drops_metadata() {
    let (mut store, config, _tmp) = open_store();
    store.upload("gone".into(), Bytes::from_static(b"1")).unwrap();
    store.upload("stays".into(), Bytes::from_static(b"2")).unwrap();
    drop(store);

    std::fs::remove_file(config.blobs_dir().join("1.bin")).unwrap();

    let store = FileStore::open(&config).unwrap();
    assert_eq!(ids(&store.list()), vec![2]);
    assert_eq!(store.stats().next_id, 3);
}

#[test]
fn test_orphaned_blobs_are_swept() {
    let (mut store, config, _tmp) = open_store();
    store.upload("real".into(), Bytes::from_static(b"1")).unwrap();
    drop(store);

    let blobs = config.blobs_dir();
    std::fs::write(blobs.join("99.bin"), b"orphan").unwrap();
    std::fs::write(blobs.join("7.bin.tmp"), b"partial").unwrap();

    let store = FileStore::open(&config).unwrap();
    assert_eq!(ids(&store.list()), vec![1]);
    assert!(blobs.join("1.bin").exists());
    assert!(!blobs.join("99.bin").exists());
    assert!(!blobs.join("7.bin.tmp").exists());
}

#[test]
fn test_orphaned_blob_ids_are_not_reused() {
    let (store, config, _tmp) = open_store();
    drop(store);

    std::fs::write(config.blobs_dir().join("99.bin"), b"orphan").unwrap();

    let mut store = FileStore::open(&config).unwrap();
    assert!(store.list().is_empty());
    let id = store.upload("fresh".into(), Bytes::from_static(b"x")).unwrap();
    assert_eq!(id, 100);
}

#[test]
fn test_corrupt_snapshot_fails_boot_and_keeps_blobs() {
    let (mut store, config, _tmp) = open_store();
    store.upload("a".into(), Bytes::from_static(b"aa")).unwrap();
    store.upload("b".into(), Bytes::from_static(b"bb")).unwrap();
    store.write_snapshot().unwrap();
    drop(store);

    std::fs::write(config.snapshot_path(), b"garbage").unwrap();

    assert!(FileStore::open(&config).is_err());
    assert!(config.blobs_dir().join("1.bin").exists());
    assert!(config.blobs_dir().join("2.bin").exists());
    assert_eq!(std::fs::read(config.snapshot_path()).unwrap(), b"garbage");
}

#[test]
fn test_snapshot_version_mismatch_fails_boot() {
    let (mut store, config, _tmp) = open_store();
    store.upload("a".into(), Bytes::from_static(b"aa")).unwrap();
    drop(store);

    let snapshot = MetadataSnapshot {
        version: SNAPSHOT_VERSION + 1,
        timestamp: chrono::Utc::now(),
        next_id: 2,
        last_upload_time: 0,
        files: Default::default(),
    };
    save_snapshot(&config.snapshot_path(), &snapshot).unwrap();

    assert!(FileStore::open(&config).is_err());
    assert!(config.blobs_dir().join("1.bin").exists());
}

#[test]
fn test_id_space_exhausted() {
    let (store, config, _tmp) = open_store();
    drop(store);

    let last = u64::MAX - 1;
    std::fs::write(config.blobs_dir().join(format!("{last}.bin")), b"x").unwrap();

    let mut store = FileStore::open(&config).unwrap();
    assert_eq!(store.stats().next_id, u64::MAX);

    let result = store.upload("one too many".into(), Bytes::from_static(b"y"));
    assert_eq!(result, Err(ServiceError::Storage("id space exhausted".into())));
    assert!(store.list().is_empty());
}
