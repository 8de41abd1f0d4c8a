//! Native cursor wrapper

use graphkv_kvstore::KvCursor;
use rocksdb::{DBRawIteratorWithThreadMode, DBWithThreadMode, MultiThreaded};

type Db = DBWithThreadMode<MultiThreaded>;

/// RocksDB raw iterator exposed as a [`KvCursor`]
///
/// The iterator borrows the database, so the handle outlives every cursor.
/// Dropping the cursor releases the native iterator.
pub(crate) struct RocksDbCursor<'a> {
    inner: DBRawIteratorWithThreadMode<'a, Db>,
}

impl<'a> RocksDbCursor<'a> {
    pub(crate) fn new(inner: DBRawIteratorWithThreadMode<'a, Db>) -> Self {
        Self { inner }
    }

    fn report_status(&self) {
        if self.inner.valid() {
            return;
        }
        // A failed cursor just ends the sequence
        if let Err(e) = self.inner.status() {
            tracing::warn!("RocksDB iterator stopped with error: {e}");
        }
    }
}

impl KvCursor for RocksDbCursor<'_> {
    fn seek(&mut self, target: &[u8]) {
        self.inner.seek(target);
        self.report_status();
    }

    fn valid(&self) -> bool {
        self.inner.valid()
    }

    fn next(&mut self) {
        self.inner.next();
        self.report_status();
    }

    fn key(&self) -> Option<&[u8]> {
        self.inner.key()
    }

    fn value(&self) -> Option<&[u8]> {
        self.inner.value()
    }
}
