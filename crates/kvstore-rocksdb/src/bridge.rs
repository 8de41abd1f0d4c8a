//! Adapters from the engine's extension traits to RocksDB's native hooks

use std::ffi::{CStr, CString};
use std::sync::Arc;

use graphkv_kvstore::{
    CompactionContext, CompactionDecision, CompactionFilter, CompactionFilterFactory,
    EngineOptions, MergeOperator,
};
use rocksdb::compaction_filter::{self, Decision};
use rocksdb::compaction_filter_factory::{self, CompactionFilterContext};
use rocksdb::{MergeOperands, Options};

/// Install the optional strategies on column family options
///
/// Absent strategies leave the options untouched.
pub(crate) fn apply(opts: &mut Options, options: &EngineOptions) {
    if let Some(op) = &options.merge_operator {
        opts.set_merge_operator(
            op.name(),
            merge_fn(Arc::clone(op), false),
            merge_fn(Arc::clone(op), true),
        );
    }

    if let Some(factory) = &options.compaction_filter_factory {
        opts.set_compaction_filter_factory(FactoryBridge::new(Arc::clone(factory)));
    }
}

fn merge_fn(
    op: Arc<dyn MergeOperator>,
    partial: bool,
) -> impl Fn(&[u8], Option<&[u8]>, &MergeOperands) -> Option<Vec<u8>> + Clone + Send + Sync + 'static
{
    move |key: &[u8], existing: Option<&[u8]>, operands: &MergeOperands| {
        let operands: Vec<&[u8]> = operands.iter().collect();
        if partial {
            op.partial_merge(key, &operands)
        } else {
            op.full_merge(key, existing, &operands)
        }
    }
}

fn native_name(name: &str) -> CString {
    CString::new(name).unwrap_or_else(|_| CString::from(c"graphkv"))
}

struct FactoryBridge {
    inner: Arc<dyn CompactionFilterFactory>,
    name: CString,
}

impl FactoryBridge {
    fn new(inner: Arc<dyn CompactionFilterFactory>) -> Self {
        let name = native_name(inner.name());
        Self { inner, name }
    }
}

impl compaction_filter_factory::CompactionFilterFactory for FactoryBridge {
    type Filter = FilterBridge;

    fn create(&mut self, context: CompactionFilterContext) -> Self::Filter {
        let context = CompactionContext {
            is_full_compaction: context.is_full_compaction,
            is_manual_compaction: context.is_manual_compaction,
        };
        FilterBridge {
            inner: self.inner.create(context),
            name: self.name.clone(),
        }
    }

    fn name(&self) -> &CStr {
        &self.name
    }
}

struct FilterBridge {
    inner: Box<dyn CompactionFilter>,
    name: CString,
}

impl compaction_filter::CompactionFilter for FilterBridge {
    fn filter(&mut self, level: u32, key: &[u8], value: &[u8]) -> Decision {
        match self.inner.filter(level, key, value) {
            CompactionDecision::Keep => Decision::Keep,
            CompactionDecision::Remove => Decision::Remove,
        }
    }

    fn name(&self) -> &CStr {
        &self.name
    }
}
