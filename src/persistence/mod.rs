pub mod blobs;
pub mod snapshot;
pub mod wal;
