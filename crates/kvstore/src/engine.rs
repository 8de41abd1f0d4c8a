//! Storage engine contract
//!
//! A [`StorageEngine`] is bound to exactly one graph space for its whole
//! lifetime. All operations block on the calling thread; implementations are
//! responsible for their own internal thread safety and add no retries.

use std::fmt::{self, Display};
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;

use crate::{KvPair, StorageIter, StorageResult};

/// Default number of bytes reserved up front for a batched write
pub const DEFAULT_BATCH_RESERVED_BYTES: usize = 4 * 1024;

/// Identifier of a logical graph space (partition)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GraphSpaceId(pub i32);

impl GraphSpaceId {
    /// Create a new space identifier
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Raw identifier
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl Display for GraphSpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for GraphSpaceId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

/// Key-value storage engine for one graph space
///
/// Keys and values are opaque bytes ordered lexicographically. A missing key
/// is reported as [`StorageError::KeyNotFound`](crate::StorageError), which
/// callers treat as ordinary control flow.
pub trait StorageEngine: Send + Sync {
    /// The graph space this engine is bound to
    fn space_id(&self) -> GraphSpaceId;

    /// Read a single key
    fn get(&self, key: &[u8]) -> StorageResult<Bytes>;

    /// Write a single key
    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Atomically write a batch of pairs; either all or none become visible
    fn multi_put(&self, kvs: &[KvPair]) -> StorageResult<()>;

    /// Iterate over `[start, end)`
    ///
    /// Succeeds even when nothing lies in the range; emptiness shows up as an
    /// iterator that is invalid from the start.
    fn range(&self, start: &[u8], end: &[u8]) -> StorageResult<Box<dyn StorageIter + '_>>;

    /// Iterate over every key starting with `prefix`
    fn prefix(&self, prefix: &[u8]) -> StorageResult<Box<dyn StorageIter + '_>>;

    /// Delete a single key; deleting an absent key succeeds
    fn remove(&self, key: &[u8]) -> StorageResult<()>;

    /// Delete every key in `[start, end)` in one atomic operation
    fn remove_range(&self, start: &[u8], end: &[u8]) -> StorageResult<()>;

    /// Bulk-load backend-native sorted files; all or nothing
    fn ingest(&self, files: &[PathBuf]) -> StorageResult<()>;

    /// Hand `operand` to the configured merge operator for `key`
    fn merge(&self, key: &[u8], operand: &[u8]) -> StorageResult<()>;

    /// Persist any buffered writes
    fn flush(&self) -> StorageResult<()>;

    /// Compact the whole key space, running the compaction filter if any
    fn compact(&self) -> StorageResult<()>;
}

/// Implement StorageEngine for Arc<T> where T: StorageEngine
impl<T: StorageEngine + ?Sized> StorageEngine for Arc<T> {
    fn space_id(&self) -> GraphSpaceId {
        (**self).space_id()
    }

    fn get(&self, key: &[u8]) -> StorageResult<Bytes> {
        (**self).get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        (**self).put(key, value)
    }

    fn multi_put(&self, kvs: &[KvPair]) -> StorageResult<()> {
        (**self).multi_put(kvs)
    }

    fn range(&self, start: &[u8], end: &[u8]) -> StorageResult<Box<dyn StorageIter + '_>> {
        (**self).range(start, end)
    }

    fn prefix(&self, prefix: &[u8]) -> StorageResult<Box<dyn StorageIter + '_>> {
        (**self).prefix(prefix)
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn remove_range(&self, start: &[u8], end: &[u8]) -> StorageResult<()> {
        (**self).remove_range(start, end)
    }

    fn ingest(&self, files: &[PathBuf]) -> StorageResult<()> {
        (**self).ingest(files)
    }

    fn merge(&self, key: &[u8], operand: &[u8]) -> StorageResult<()> {
        (**self).merge(key, operand)
    }

    fn flush(&self) -> StorageResult<()> {
        (**self).flush()
    }

    fn compact(&self) -> StorageResult<()> {
        (**self).compact()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_space_id() {
        let id = GraphSpaceId::from(42);
        assert_eq!(id, GraphSpaceId::new(42));
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
        assert!(GraphSpaceId::new(-1) < GraphSpaceId::new(0));
    }
}
