//! Lazy, ordered iteration over stored pairs
//!
//! Backends only provide a [`KvCursor`] over their native iterator. The two
//! bounding strategies, [`RangeIter`] and [`PrefixIter`], are shared by every
//! backend and exposed to callers as a [`StorageIter`].
//!
//! Iterators are forward-only and single-use. Once an iterator reports
//! `valid() == false` it stays invalid, even if the underlying cursor could
//! be advanced further. Dropping an iterator drops its cursor, which is where
//! backends release native resources.

use std::iter::FusedIterator;

use bytes::Bytes;

/// A key/value pair, the unit of batched writes and of [`Pairs`]
pub type KvPair = (Bytes, Bytes);

/// Backend-native cursor over keys in ascending byte order
pub trait KvCursor {
    /// Position at the first key greater than or equal to `target`
    fn seek(&mut self, target: &[u8]);

    /// Whether the cursor points at an entry
    fn valid(&self) -> bool;

    /// Advance to the next entry
    fn next(&mut self);

    /// Key under the cursor, `None` when invalid
    fn key(&self) -> Option<&[u8]>;

    /// Value under the cursor, `None` when invalid
    fn value(&self) -> Option<&[u8]>;
}

/// Uniform lazy sequence returned by `range` and `prefix`
///
/// `key` and `value` return an empty slice once the iterator is invalid, and
/// `next` is a no-op.
pub trait StorageIter {
    /// Whether the iterator points at a pair inside its bounds
    fn valid(&self) -> bool;

    /// Advance to the next pair
    fn next(&mut self);

    /// Current key
    fn key(&self) -> &[u8];

    /// Current value
    fn value(&self) -> &[u8];
}

impl<I: StorageIter + ?Sized> StorageIter for Box<I> {
    fn valid(&self) -> bool {
        (**self).valid()
    }

    fn next(&mut self) {
        (**self).next();
    }

    fn key(&self) -> &[u8] {
        (**self).key()
    }

    fn value(&self) -> &[u8] {
        (**self).value()
    }
}

/// Iterator over `[start, end)`
pub struct RangeIter<C> {
    cursor: C,
    end: Bytes,
    exhausted: bool,
}

impl<C: KvCursor> RangeIter<C> {
    /// Seek `cursor` to `start` and bound it by `end` (exclusive)
    pub fn new(mut cursor: C, start: &[u8], end: &[u8]) -> Self {
        cursor.seek(start);
        let mut iter = Self {
            cursor,
            end: Bytes::copy_from_slice(end),
            exhausted: false,
        };
        iter.settle();
        iter
    }

    fn settle(&mut self) {
        let in_bounds = self.cursor.valid()
            && self
                .cursor
                .key()
                .is_some_and(|key| key < &self.end[..]);
        if !in_bounds {
            self.exhausted = true;
        }
    }
}

impl<C: KvCursor> StorageIter for RangeIter<C> {
    fn valid(&self) -> bool {
        !self.exhausted
    }

    fn next(&mut self) {
        if self.exhausted {
            return;
        }
        self.cursor.next();
        self.settle();
    }

    fn key(&self) -> &[u8] {
        if self.exhausted {
            return &[];
        }
        self.cursor.key().unwrap_or_default()
    }

    fn value(&self) -> &[u8] {
        if self.exhausted {
            return &[];
        }
        self.cursor.value().unwrap_or_default()
    }
}

/// Iterator over every key starting with a prefix
pub struct PrefixIter<C> {
    cursor: C,
    prefix: Bytes,
    exhausted: bool,
}

impl<C: KvCursor> PrefixIter<C> {
    /// Seek `cursor` to `prefix` and stop at the first key not sharing it
    pub fn new(mut cursor: C, prefix: &[u8]) -> Self {
        cursor.seek(prefix);
        let mut iter = Self {
            cursor,
            prefix: Bytes::copy_from_slice(prefix),
            exhausted: false,
        };
        iter.settle();
        iter
    }

    fn settle(&mut self) {
        let matches = self.cursor.valid()
            && self
                .cursor
                .key()
                .is_some_and(|key| key.starts_with(&self.prefix));
        if !matches {
            self.exhausted = true;
        }
    }
}

impl<C: KvCursor> StorageIter for PrefixIter<C> {
    fn valid(&self) -> bool {
        !self.exhausted
    }

    fn next(&mut self) {
        if self.exhausted {
            return;
        }
        self.cursor.next();
        self.settle();
    }

    fn key(&self) -> &[u8] {
        if self.exhausted {
            return &[];
        }
        self.cursor.key().unwrap_or_default()
    }

    fn value(&self) -> &[u8] {
        if self.exhausted {
            return &[];
        }
        self.cursor.value().unwrap_or_default()
    }
}

/// Adapter yielding owned pairs from a [`StorageIter`]
pub struct Pairs<I> {
    iter: I,
}

impl<I: StorageIter> Iterator for Pairs<I> {
    type Item = KvPair;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.iter.valid() {
            return None;
        }
        let pair = (
            Bytes::copy_from_slice(self.iter.key()),
            Bytes::copy_from_slice(self.iter.value()),
        );
        StorageIter::next(&mut self.iter);
        Some(pair)
    }
}

impl<I: StorageIter> FusedIterator for Pairs<I> {}

/// Extension methods for every [`StorageIter`]
pub trait StorageIterExt: StorageIter + Sized {
    /// Consume the iterator as a `std` iterator of owned pairs
    fn pairs(self) -> Pairs<Self> {
        Pairs { iter: self }
    }
}

impl<I: StorageIter> StorageIterExt for I {}
