//! In-memory storage engine implementation
//!
//! Intended for tests and local development. Data lives in an ordered map
//! behind a copy-on-write `Arc`, so every iterator reads a consistent
//! snapshot while writers carry on.

use bytes::Bytes;
use graphkv_kvstore::{
    CompactionContext, CompactionDecision, EngineOptions, GraphSpaceId, KvCursor, KvPair,
    PrefixIter, RangeIter, StorageEngine, StorageError, StorageIter, StorageResult, display_key,
};
use parking_lot::RwLock;
use std::{collections::BTreeMap, ops::Bound, path::PathBuf, sync::Arc};

type Snapshot = Arc<BTreeMap<Bytes, Bytes>>;

/// In-memory storage engine using a BTreeMap for ordering
pub struct MemoryEngine {
    space_id: GraphSpaceId,
    /// Current contents; replaced wholesale on write when a snapshot is held
    data: RwLock<Snapshot>,
    options: EngineOptions,
}

impl MemoryEngine {
    /// Create an empty engine for `space_id`
    pub fn new(space_id: GraphSpaceId) -> Self {
        Self::with_options(space_id, EngineOptions::default())
    }

    /// Create an empty engine using the given strategies
    pub fn with_options(space_id: GraphSpaceId, options: EngineOptions) -> Self {
        Self {
            space_id,
            data: RwLock::new(Arc::new(BTreeMap::new())),
            options,
        }
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.data.read())
    }
}

impl StorageEngine for MemoryEngine {
    fn space_id(&self) -> GraphSpaceId {
        self.space_id
    }

    fn get(&self, key: &[u8]) -> StorageResult<Bytes> {
        self.data.read().get(key).cloned().ok_or_else(|| {
            tracing::trace!(
                "Key {} not found in space {}",
                display_key(key),
                self.space_id
            );
            StorageError::key_not_found(key)
        })
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let mut data = self.data.write();
        Arc::make_mut(&mut data).insert(
            Bytes::copy_from_slice(key),
            Bytes::copy_from_slice(value),
        );
        Ok(())
    }

    fn multi_put(&self, kvs: &[KvPair]) -> StorageResult<()> {
        // A single write lock makes the whole batch visible at once
        let mut data = self.data.write();
        let map = Arc::make_mut(&mut data);
        for (key, value) in kvs {
            map.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn range(&self, start: &[u8], end: &[u8]) -> StorageResult<Box<dyn StorageIter + '_>> {
        let cursor = SnapshotCursor::new(self.snapshot());
        Ok(Box::new(RangeIter::new(cursor, start, end)))
    }

    fn prefix(&self, prefix: &[u8]) -> StorageResult<Box<dyn StorageIter + '_>> {
        let cursor = SnapshotCursor::new(self.snapshot());
        Ok(Box::new(PrefixIter::new(cursor, prefix)))
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        let mut data = self.data.write();
        if data.contains_key(key) {
            Arc::make_mut(&mut data).remove(key);
        }
        Ok(())
    }

    fn remove_range(&self, start: &[u8], end: &[u8]) -> StorageResult<()> {
        if start >= end {
            return Ok(());
        }

        let mut data = self.data.write();
        let map = Arc::make_mut(&mut data);
        // Split off [start, ..), then put back everything from `end` on
        let mut tail = map.split_off(start);
        let mut kept = tail.split_off(end);
        map.append(&mut kept);
        Ok(())
    }

    fn ingest(&self, files: &[PathBuf]) -> StorageResult<()> {
        Err(StorageError::NotSupported(format!(
            "in-memory engine cannot ingest {} external file(s)",
            files.len()
        )))
    }

    fn merge(&self, key: &[u8], operand: &[u8]) -> StorageResult<()> {
        let Some(op) = &self.options.merge_operator else {
            return Err(StorageError::NotSupported(
                "merge requires a merge operator".to_string(),
            ));
        };

        let mut data = self.data.write();
        let existing = data.get(key).cloned();
        let merged = op
            .full_merge(key, existing.as_deref(), &[operand])
            .ok_or_else(|| {
                StorageError::Backend(format!(
                    "Merge operator {} failed for key {}",
                    op.name(),
                    display_key(key)
                ))
            })?;
        Arc::make_mut(&mut data).insert(Bytes::copy_from_slice(key), Bytes::from(merged));
        Ok(())
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }

    fn compact(&self) -> StorageResult<()> {
        let Some(factory) = &self.options.compaction_filter_factory else {
            return Ok(());
        };

        let mut filter = factory.create(CompactionContext {
            is_full_compaction: true,
            is_manual_compaction: true,
        });

        let mut data = self.data.write();
        let doomed: Vec<Bytes> = data
            .iter()
            .filter(|(key, value)| filter.filter(0, key, value) == CompactionDecision::Remove)
            .map(|(key, _)| key.clone())
            .collect();

        if !doomed.is_empty() {
            tracing::debug!(
                "Compaction filter {} removed {} entries from space {}",
                factory.name(),
                doomed.len(),
                self.space_id
            );
            let map = Arc::make_mut(&mut data);
            for key in doomed {
                map.remove(&key);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("space_id", &self.space_id)
            .field("data", &"<locked>")
            .field("options", &self.options)
            .finish()
    }
}

/// Cursor over a frozen snapshot of the map
struct SnapshotCursor {
    snapshot: Snapshot,
    current: Option<(Bytes, Bytes)>,
}

impl SnapshotCursor {
    fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            current: None,
        }
    }

    fn position(&mut self, lower: Bound<&[u8]>) {
        self.current = self
            .snapshot
            .range::<[u8], _>((lower, Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.clone(), v.clone()));
    }
}

impl KvCursor for SnapshotCursor {
    fn seek(&mut self, target: &[u8]) {
        self.position(Bound::Included(target));
    }

    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn next(&mut self) {
        if let Some((key, _)) = self.current.take() {
            self.position(Bound::Excluded(&key[..]));
        }
    }

    fn key(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(k, _)| k.as_ref())
    }

    fn value(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(_, v)| v.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphkv_kvstore::{
        CompactionFilter, CompactionFilterFactory, MergeOperator, ResultCode, StorageIterExt,
    };

    fn kv(key: &str, value: &str) -> KvPair {
        (Bytes::copy_from_slice(key.as_bytes()), Bytes::copy_from_slice(value.as_bytes()))
    }

    fn collect(iter: Box<dyn StorageIter + '_>) -> Vec<KvPair> {
        iter.pairs().collect()
    }

    #[test]
    fn test_memory_engine() {
        let engine = MemoryEngine::new(GraphSpaceId::new(9));
        assert_eq!(engine.space_id(), GraphSpaceId::new(9));
        assert!(engine.is_empty());

        assert_eq!(ResultCode::of(&engine.get(b"a")), ResultCode::KeyNotFound);
        engine.put(b"a", b"1").unwrap();
        assert_eq!(engine.get(b"a").unwrap(), Bytes::from("1"));
        assert_eq!(engine.len(), 1);

        engine.remove(b"a").unwrap();
        engine.remove(b"a").unwrap();
        assert!(engine.get(b"a").unwrap_err().is_not_found());
    }

    #[test]
    fn test_end_to_end_scenario() {
        let engine = MemoryEngine::new(GraphSpaceId::new(1));
        engine
            .multi_put(&[kv("a", "1"), kv("b", "2"), kv("c", "3")])
            .unwrap();

        assert_eq!(
            collect(engine.range(b"a", b"c").unwrap()),
            vec![kv("a", "1"), kv("b", "2")]
        );
        assert_eq!(collect(engine.prefix(b"a").unwrap()), vec![kv("a", "1")]);

        engine.remove_range(b"a", b"b").unwrap();
        assert_eq!(ResultCode::of(&engine.get(b"a")), ResultCode::KeyNotFound);
        assert_eq!(engine.get(b"b").unwrap(), Bytes::from("2"));
    }

    #[test]
    fn test_remove_range_bounds() {
        let engine = MemoryEngine::new(GraphSpaceId::new(1));
        let batch: Vec<KvPair> = (0..10).map(|i| kv(&format!("k{i}"), "v")).collect();
        engine.multi_put(&batch).unwrap();

        engine.remove_range(b"k3", b"k7").unwrap();
        assert!(collect(engine.range(b"k3", b"k7").unwrap()).is_empty());
        assert_eq!(engine.len(), 6);
        assert!(engine.get(b"k2").is_ok());
        assert!(engine.get(b"k7").is_ok());

        engine.remove_range(b"k9", b"k0").unwrap();
        assert_eq!(engine.len(), 6);
    }

    #[test]
    fn test_iterator_reads_snapshot() {
        let engine = MemoryEngine::new(GraphSpaceId::new(1));
        engine.multi_put(&[kv("a", "1"), kv("b", "2")]).unwrap();

        let mut iter = engine.prefix(b"").unwrap();
        assert_eq!(iter.key(), b"a");

        // Writes after the iterator was created are not observed by it
        engine.put(b"aa", b"new").unwrap();
        engine.remove(b"b").unwrap();

        iter.next();
        assert_eq!(iter.key(), b"b");
        iter.next();
        assert!(!iter.valid());

        assert_eq!(engine.get(b"aa").unwrap(), Bytes::from("new"));
    }

    #[test]
    fn test_ingest_not_supported() {
        let engine = MemoryEngine::new(GraphSpaceId::new(1));
        let result = engine.ingest(&[PathBuf::from("/tmp/data.sst")]);
        assert!(matches!(result, Err(StorageError::NotSupported(_))));
        assert_eq!(ResultCode::of(&result), ResultCode::Unknown);
    }

    struct Append;

    impl MergeOperator for Append {
        fn name(&self) -> &str {
            "append"
        }

        fn full_merge(
            &self,
            _key: &[u8],
            existing: Option<&[u8]>,
            operands: &[&[u8]],
        ) -> Option<Vec<u8>> {
            let mut out = existing.map(<[u8]>::to_vec).unwrap_or_default();
            for op in operands {
                out.extend_from_slice(op);
            }
            Some(out)
        }
    }

    #[test]
    fn test_merge() {
        let engine = MemoryEngine::new(GraphSpaceId::new(1));
        assert_eq!(ResultCode::of(&engine.merge(b"k", b"x")), ResultCode::Unknown);

        let engine = MemoryEngine::with_options(
            GraphSpaceId::new(1),
            EngineOptions::new().with_merge_operator(Arc::new(Append)),
        );
        engine.merge(b"k", b"x").unwrap();
        engine.merge(b"k", b"y").unwrap();
        assert_eq!(engine.get(b"k").unwrap(), Bytes::from("xy"));
    }

    struct DropOdd;

    struct DropOddFilter;

    impl CompactionFilter for DropOddFilter {
        fn filter(&mut self, level: u32, _key: &[u8], value: &[u8]) -> CompactionDecision {
            assert_eq!(level, 0);
            if value.last().is_some_and(|b| b % 2 == 1) {
                CompactionDecision::Remove
            } else {
                CompactionDecision::Keep
            }
        }
    }

    impl CompactionFilterFactory for DropOdd {
        fn name(&self) -> &str {
            "drop_odd"
        }

        fn create(&self, context: CompactionContext) -> Box<dyn CompactionFilter> {
            assert!(context.is_manual_compaction);
            Box::new(DropOddFilter)
        }
    }

    #[test]
    fn test_compaction_filter() {
        let engine = MemoryEngine::with_options(
            GraphSpaceId::new(1),
            EngineOptions::new().with_compaction_filter_factory(Arc::new(DropOdd)),
        );
        engine
            .multi_put(&[kv("a", "1"), kv("b", "2"), kv("c", "3")])
            .unwrap();

        engine.compact().unwrap();

        assert!(engine.get(b"a").unwrap_err().is_not_found());
        assert_eq!(engine.get(b"b").unwrap(), Bytes::from("2"));
        assert!(engine.get(b"c").unwrap_err().is_not_found());
    }

    #[test]
    fn test_compact_without_filter_is_noop() {
        let engine = MemoryEngine::new(GraphSpaceId::new(1));
        engine.multi_put(&[kv("a", "1")]).unwrap();
        engine.flush().unwrap();
        engine.compact().unwrap();
        assert_eq!(engine.len(), 1);
    }
}
