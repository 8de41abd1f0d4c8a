//! Space-partitioned key-value storage engine abstraction
//!
//! This crate defines the contract every local storage backend satisfies:
//! point reads and writes, atomic batches, ordered range and prefix
//! iteration, range deletion and bulk ingestion. Backends live in their own
//! crates and plug in custom merge and compaction behaviour through the
//! traits in [`extension`].

pub mod engine;
pub mod error;
pub mod extension;
pub mod iter;

// Re-export the essential types
pub use engine::{DEFAULT_BATCH_RESERVED_BYTES, GraphSpaceId, StorageEngine};
pub use error::{ResultCode, StorageError, StorageResult, display_key};
pub use extension::{
    CompactionContext, CompactionDecision, CompactionFilter, CompactionFilterFactory,
    EngineOptions, MergeOperator,
};
pub use iter::{KvCursor, KvPair, Pairs, PrefixIter, RangeIter, StorageIter, StorageIterExt};
