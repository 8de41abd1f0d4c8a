//! RocksDB configuration

use std::path::PathBuf;

use graphkv_kvstore::DEFAULT_BATCH_RESERVED_BYTES;

/// Configuration for a RocksDB engine
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Directory holding the database, created if missing
    pub path: PathBuf,
    /// Bytes reserved up front for each `multi_put` write batch
    pub batch_reserved_bytes: usize,
    /// Sync the write-ahead log before acknowledging each write
    pub sync_writes: bool,
}

impl RocksDbConfig {
    /// Create a new configuration with the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            batch_reserved_bytes: DEFAULT_BATCH_RESERVED_BYTES,
            sync_writes: false,
        }
    }

    /// Override the write batch reservation hint
    pub fn with_batch_reserved_bytes(mut self, bytes: usize) -> Self {
        self.batch_reserved_bytes = bytes;
        self
    }

    /// Require synced writes
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }
}
