//! Backend extension points
//!
//! Merge operators and compaction filters are expressed with crate-local
//! traits so callers never touch backend types. Each backend bridges them to
//! its native hooks.

use std::fmt::{self, Debug};
use std::sync::Arc;

/// Combines multiple writes to the same key instead of overwriting
pub trait MergeOperator: Send + Sync {
    /// Stable name, recorded by backends that persist it
    fn name(&self) -> &str;

    /// Fold `operands` (oldest first) onto the existing value, if any
    ///
    /// Returning `None` signals a merge failure to the backend.
    fn full_merge(
        &self,
        key: &[u8],
        existing: Option<&[u8]>,
        operands: &[&[u8]],
    ) -> Option<Vec<u8>>;

    /// Combine operands without the base value
    ///
    /// The default declines, which makes the backend keep the operands
    /// until a full merge is possible.
    fn partial_merge(&self, _key: &[u8], _operands: &[&[u8]]) -> Option<Vec<u8>> {
        None
    }
}

/// What to do with an entry seen during compaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompactionDecision {
    /// Keep the entry
    Keep,
    /// Drop the entry
    Remove,
}

/// Per-compaction filter produced by a [`CompactionFilterFactory`]
pub trait CompactionFilter: Send {
    /// Decide the fate of one entry at the given level
    fn filter(&mut self, level: u32, key: &[u8], value: &[u8]) -> CompactionDecision;
}

/// Context handed to a factory when a compaction starts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompactionContext {
    /// Every file of the store takes part in this compaction
    pub is_full_compaction: bool,
    /// The compaction was requested explicitly rather than scheduled
    pub is_manual_compaction: bool,
}

/// Creates a fresh [`CompactionFilter`] for each compaction run
pub trait CompactionFilterFactory: Send + Sync {
    /// Stable name of the factory
    fn name(&self) -> &str;

    /// Build the filter for one compaction
    fn create(&self, context: CompactionContext) -> Box<dyn CompactionFilter>;
}

/// Optional strategies shared with an engine at construction
///
/// Both are reference-counted: the caller may keep its own handle, and the
/// engine keeps one for as long as the backend can call into it. A `None`
/// leaves the backend's default behaviour untouched.
#[derive(Clone, Default)]
pub struct EngineOptions {
    /// Merge operator used by `merge`
    pub merge_operator: Option<Arc<dyn MergeOperator>>,
    /// Factory for filters run during compaction
    pub compaction_filter_factory: Option<Arc<dyn CompactionFilterFactory>>,
}

impl EngineOptions {
    /// Options without any strategy
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given merge operator
    pub fn with_merge_operator(mut self, op: Arc<dyn MergeOperator>) -> Self {
        self.merge_operator = Some(op);
        self
    }

    /// Use the given compaction filter factory
    pub fn with_compaction_filter_factory(
        mut self,
        factory: Arc<dyn CompactionFilterFactory>,
    ) -> Self {
        self.compaction_filter_factory = Some(factory);
        self
    }
}

impl Debug for EngineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineOptions")
            .field(
                "merge_operator",
                &self.merge_operator.as_ref().map(|op| op.name()),
            )
            .field(
                "compaction_filter_factory",
                &self.compaction_filter_factory.as_ref().map(|f| f.name()),
            )
            .finish()
    }
}
