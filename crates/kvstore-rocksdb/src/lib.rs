//! RocksDB storage engine implementation

mod bridge;
pub mod config;
mod cursor;
pub mod sst;

pub use config::RocksDbConfig;
pub use sst::SstFileBuilder;

use bytes::Bytes;
use graphkv_kvstore::{
    EngineOptions, GraphSpaceId, KvPair, PrefixIter, RangeIter, StorageEngine, StorageError,
    StorageIter, StorageResult, display_key,
};
use rocksdb::{
    BottommostLevelCompaction, BoundColumnFamily, ColumnFamilyDescriptor, CompactOptions,
    DBWithThreadMode, DEFAULT_COLUMN_FAMILY_NAME, ErrorKind, MultiThreaded, Options, ReadOptions,
    WriteBatch, WriteOptions,
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::cursor::RocksDbCursor;

type Db = DBWithThreadMode<MultiThreaded>;

/// Map a native RocksDB error onto [`StorageError`]
///
/// A missing key is never an error here: `get` sees it as `Ok(None)`, so a
/// native `NotFound` from any other call is a backend failure like the rest.
/// Kinds without a dedicated variant become [`StorageError::Backend`].
pub fn classify(err: rocksdb::Error) -> StorageError {
    classify_kind(err.kind(), err.into_string())
}

fn classify_kind(kind: ErrorKind, message: String) -> StorageError {
    match kind {
        ErrorKind::InvalidArgument => StorageError::InvalidArgument(message),
        ErrorKind::NotSupported => StorageError::NotSupported(message),
        ErrorKind::IOError => StorageError::Io(std::io::Error::other(message)),
        _ => StorageError::Backend(message),
    }
}

/// RocksDB-backed storage engine for one graph space
///
/// The engine owns the database handle; it is opened by [`RocksDbEngine::open`]
/// and closed when the engine is dropped. Iterators borrow the engine, so
/// the handle always outlives them.
pub struct RocksDbEngine {
    /// Graph space this engine serves
    space_id: GraphSpaceId,
    /// On-disk location of the database
    path: PathBuf,
    /// The RocksDB instance
    db: Db,
    /// Reservation hint for write batches
    batch_reserved_bytes: usize,
    /// Sync the WAL on every write
    sync_writes: bool,
    /// Strategies shared with the backend
    options: EngineOptions,
}

impl RocksDbEngine {
    /// Open (or create) the database at `config.path` for `space_id`
    ///
    /// On error nothing is left open.
    pub fn open(
        space_id: GraphSpaceId,
        config: RocksDbConfig,
        options: EngineOptions,
    ) -> StorageResult<Self> {
        tracing::info!(
            "Opening RocksDB for space {} at {}",
            space_id,
            config.path.display()
        );

        let db = Self::open_db(&config.path, &options).inspect_err(|e| {
            tracing::error!(
                "Failed to open RocksDB for space {} at {}: {e}",
                space_id,
                config.path.display()
            );
        })?;

        Ok(Self {
            space_id,
            path: config.path,
            db,
            batch_reserved_bytes: config.batch_reserved_bytes,
            sync_writes: config.sync_writes,
            options,
        })
    }

    fn open_db(path: &Path, options: &EngineOptions) -> StorageResult<Db> {
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let mut cf_opts = Options::default();
        bridge::apply(&mut cf_opts, options);

        let cfs = vec![ColumnFamilyDescriptor::new(
            DEFAULT_COLUMN_FAMILY_NAME,
            cf_opts,
        )];

        Db::open_cf_descriptors(&db_opts, path, cfs)
            .map_err(|e| StorageError::Backend(format!("Failed to open RocksDB: {e}")))
    }

    /// Directory holding this engine's data
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strategies this engine was opened with
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    fn default_cf(&self) -> StorageResult<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(DEFAULT_COLUMN_FAMILY_NAME)
            .ok_or_else(|| StorageError::Backend("Default column family missing".to_string()))
    }

    fn write_options(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.sync_writes);
        opts
    }
}

impl StorageEngine for RocksDbEngine {
    fn space_id(&self) -> GraphSpaceId {
        self.space_id
    }

    fn get(&self, key: &[u8]) -> StorageResult<Bytes> {
        match self.db.get_pinned(key) {
            Ok(Some(value)) => Ok(Bytes::copy_from_slice(&value)),
            Ok(None) => {
                tracing::trace!(
                    "Key {} not found in space {}",
                    display_key(key),
                    self.space_id
                );
                Err(StorageError::key_not_found(key))
            }
            Err(e) => Err(classify(e)),
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.db
            .put_opt(key, value, &self.write_options())
            .map_err(classify)
    }

    fn multi_put(&self, kvs: &[KvPair]) -> StorageResult<()> {
        let mut batch = WriteBatch::with_capacity_bytes(self.batch_reserved_bytes);
        for (key, value) in kvs {
            batch.put(key, value);
        }

        tracing::debug!(
            "Writing batch of {} entries to space {}",
            kvs.len(),
            self.space_id
        );
        self.db
            .write_opt(batch, &self.write_options())
            .map_err(classify)
    }

    fn range(&self, start: &[u8], end: &[u8]) -> StorageResult<Box<dyn StorageIter + '_>> {
        let mut read_opts = ReadOptions::default();
        read_opts.set_iterate_upper_bound(end.to_vec());
        let cursor = RocksDbCursor::new(self.db.raw_iterator_opt(read_opts));
        Ok(Box::new(RangeIter::new(cursor, start, end)))
    }

    fn prefix(&self, prefix: &[u8]) -> StorageResult<Box<dyn StorageIter + '_>> {
        let cursor = RocksDbCursor::new(self.db.raw_iterator());
        Ok(Box::new(PrefixIter::new(cursor, prefix)))
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        self.db
            .delete_opt(key, &self.write_options())
            .map_err(classify)
    }

    fn remove_range(&self, start: &[u8], end: &[u8]) -> StorageResult<()> {
        // RocksDB rejects inverted bounds; the range is empty either way
        if start >= end {
            return Ok(());
        }
        let cf = self.default_cf()?;
        self.db
            .delete_range_cf_opt(&cf, start, end, &self.write_options())
            .map_err(classify)
    }

    fn ingest(&self, files: &[PathBuf]) -> StorageResult<()> {
        tracing::info!(
            "Ingesting {} external file(s) into space {}",
            files.len(),
            self.space_id
        );
        self.db
            .ingest_external_file(files.to_vec())
            .map_err(classify)
    }

    fn merge(&self, key: &[u8], operand: &[u8]) -> StorageResult<()> {
        self.db
            .merge_opt(key, operand, &self.write_options())
            .map_err(classify)
    }

    fn flush(&self) -> StorageResult<()> {
        self.db.flush().map_err(classify)
    }

    fn compact(&self) -> StorageResult<()> {
        let mut opts = CompactOptions::default();
        opts.set_bottommost_level_compaction(BottommostLevelCompaction::Force);
        self.db.compact_range_opt(None::<&[u8]>, None::<&[u8]>, &opts);
        Ok(())
    }
}

impl std::fmt::Debug for RocksDbEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksDbEngine")
            .field("space_id", &self.space_id)
            .field("path", &self.path)
            .field("options", &self.options)
            .finish()
    }
}

impl Drop for RocksDbEngine {
    fn drop(&mut self) {
        // The handle closes when `db` is dropped right after this
        tracing::debug!(
            "Closing RocksDB for space {} at {}",
            self.space_id,
            self.path.display()
        );
    }
}
