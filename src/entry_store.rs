//! Dense, append-only storage for the map's key-value records.
//!
//! The slot table never stores keys or values; it stores an index into an
//! [`EntryStore`]. Records are appended in insertion order, updated in place
//! and cleared in place on removal. A removed index becomes a hole that is
//! only reclaimed by [`EntryStore::compact`].

use alloc::vec::Vec;

/// Number of records per chunk in [`ChunkedArrayStore`].
pub const CHUNK_LEN: usize = 1 << CHUNK_SHIFT;
const CHUNK_SHIFT: u32 = 6;

/// Marker stored in the remap table for indices that were holes.
pub const REMOVED: usize = usize::MAX;

#[cold]
#[inline(never)]
fn invalid_index(index: usize) -> ! {
    panic!("invalid entry index {index}: never appended or already removed")
}

/// A dense record store addressed by integer index.
///
/// Indices handed out by [`push`](EntryStore::push) increase monotonically and
/// stay valid until the record is removed or the store is compacted or
/// cleared. Accessing any other index is an engine bug and panics.
pub trait EntryStore<K, V> {
    /// Iterator over live records in index order.
    type Iter<'a>: Iterator<Item = (&'a K, &'a V)>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    /// Mutable iterator over live records in index order.
    type IterMut<'a>: Iterator<Item = (&'a K, &'a mut V)>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    /// Creates a store with room for `capacity` records.
    fn with_capacity(capacity: usize) -> Self;

    /// Number of live records.
    fn len(&self) -> usize;

    /// Returns `true` if there are no live records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The index the next [`push`](EntryStore::push) will return. Includes
    /// holes left by removals.
    fn next_index(&self) -> usize;

    /// Returns the record at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` was never appended or has been removed.
    fn get(&self, index: usize) -> (&K, &V);

    /// Returns the record at `index` with a mutable value.
    ///
    /// # Panics
    ///
    /// Panics if `index` was never appended or has been removed.
    fn get_mut(&mut self, index: usize) -> (&K, &mut V);

    /// Returns the key at `index`.
    fn key<'a>(&'a self, index: usize) -> &'a K
    where
        K: 'a,
        V: 'a,
    {
        self.get(index).0
    }

    /// Appends a record and returns its index.
    fn push(&mut self, key: K, value: V) -> usize;

    /// Returns the value at `found`, or appends `key` with a value made by
    /// `make_value` when `found` is `None`. The returned index is the
    /// record's dense index either way.
    fn get_or_append<'a>(
        &'a mut self,
        found: Option<usize>,
        key: K,
        make_value: impl FnOnce() -> V,
    ) -> (usize, &'a mut V)
    where
        K: 'a,
        V: 'a,
    {
        let index = match found {
            Some(index) => index,
            None => self.push(key, make_value()),
        };
        (index, self.get_mut(index).1)
    }

    /// Removes the record at `index`, leaving a hole.
    ///
    /// # Panics
    ///
    /// Panics if `index` was never appended or has already been removed.
    fn remove(&mut self, index: usize) -> (K, V);

    /// Drops every record and resets the next index to zero.
    fn clear(&mut self);

    /// Squeezes out holes while keeping records in index order.
    ///
    /// Returns a table mapping every old index below the previous
    /// [`next_index`](EntryStore::next_index) to its new index, or to
    /// [`REMOVED`] for holes.
    fn compact(&mut self) -> Vec<usize>;

    /// Iterates over live records in index order.
    fn iter(&self) -> Self::Iter<'_>;

    /// Iterates over live records in index order with mutable values.
    fn iter_mut(&mut self) -> Self::IterMut<'_>;
}

/// Adapts an iterator over record slots into an iterator over live records.
pub struct Live<I> {
    inner: I,
}

impl<'a, K: 'a, V: 'a, I> Iterator for Live<I>
where
    I: Iterator<Item = &'a Option<(K, V)>>,
{
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.inner.by_ref() {
            if let Some((k, v)) = slot {
                return Some((k, v));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

/// Mutable counterpart of [`Live`].
pub struct LiveMut<I> {
    inner: I,
}

impl<'a, K: 'a, V: 'a, I> Iterator for LiveMut<I>
where
    I: Iterator<Item = &'a mut Option<(K, V)>>,
{
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.inner.by_ref() {
            if let Some((k, v)) = slot {
                return Some((&*k, v));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

/// Hands the live records of `records` to `out` in order and returns the
/// old-to-new index table.
fn squeeze<K, V>(
    records: impl Iterator<Item = Option<(K, V)>>,
    mut out: impl FnMut((K, V)),
) -> Vec<usize> {
    let mut remap = Vec::with_capacity(records.size_hint().0);
    let mut next = 0;
    for record in records {
        match record {
            Some(record) => {
                out(record);
                remap.push(next);
                next += 1;
            }
            None => remap.push(REMOVED),
        }
    }
    remap
}

/// Records in one contiguous vector, doubled when full.
#[derive(Clone, Debug)]
pub struct SingleArrayStore<K, V> {
    records: Vec<Option<(K, V)>>,
    live: usize,
}

impl<K, V> Default for SingleArrayStore<K, V> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            live: 0,
        }
    }
}

impl<K, V> EntryStore<K, V> for SingleArrayStore<K, V> {
    type Iter<'a>
        = Live<core::slice::Iter<'a, Option<(K, V)>>>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    type IterMut<'a>
        = LiveMut<core::slice::IterMut<'a, Option<(K, V)>>>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            live: 0,
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.live
    }

    #[inline]
    fn next_index(&self) -> usize {
        self.records.len()
    }

    #[inline]
    fn get(&self, index: usize) -> (&K, &V) {
        match self.records.get(index) {
            Some(Some((k, v))) => (k, v),
            _ => invalid_index(index),
        }
    }

    #[inline]
    fn get_mut(&mut self, index: usize) -> (&K, &mut V) {
        match self.records.get_mut(index) {
            Some(Some((k, v))) => (&*k, v),
            _ => invalid_index(index),
        }
    }

    #[inline]
    fn push(&mut self, key: K, value: V) -> usize {
        let index = self.records.len();
        self.records.push(Some((key, value)));
        self.live += 1;
        index
    }

    fn remove(&mut self, index: usize) -> (K, V) {
        match self.records.get_mut(index).and_then(Option::take) {
            Some(record) => {
                self.live -= 1;
                record
            }
            None => invalid_index(index),
        }
    }

    fn clear(&mut self) {
        self.records.clear();
        self.live = 0;
    }

    fn compact(&mut self) -> Vec<usize> {
        let old = core::mem::take(&mut self.records);
        let mut records = Vec::with_capacity(old.capacity());
        let remap = squeeze(old.into_iter(), |record| records.push(Some(record)));
        debug_assert_eq!(records.len(), self.live);
        self.records = records;
        remap
    }

    fn iter(&self) -> Self::Iter<'_> {
        Live {
            inner: self.records.iter(),
        }
    }

    fn iter_mut(&mut self) -> Self::IterMut<'_> {
        LiveMut {
            inner: self.records.iter_mut(),
        }
    }
}

/// Records in fixed-size chunks of [`CHUNK_LEN`].
///
/// Growing appends a new chunk, so existing records are never moved by an
/// append. Lookups pay one extra indirection compared to
/// [`SingleArrayStore`].
#[derive(Clone, Debug)]
pub struct ChunkedArrayStore<K, V> {
    chunks: Vec<Vec<Option<(K, V)>>>,
    next: usize,
    live: usize,
}

impl<K, V> Default for ChunkedArrayStore<K, V> {
    fn default() -> Self {
        Self {
            chunks: Vec::new(),
            next: 0,
            live: 0,
        }
    }
}

impl<K, V> ChunkedArrayStore<K, V> {
    #[inline(always)]
    fn locate(index: usize) -> (usize, usize) {
        (index >> CHUNK_SHIFT, index & (CHUNK_LEN - 1))
    }

    fn slot(&self, index: usize) -> Option<&Option<(K, V)>> {
        let (chunk, offset) = Self::locate(index);
        self.chunks.get(chunk)?.get(offset)
    }

    fn slot_mut(&mut self, index: usize) -> Option<&mut Option<(K, V)>> {
        let (chunk, offset) = Self::locate(index);
        self.chunks.get_mut(chunk)?.get_mut(offset)
    }

    /// Number of allocated chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

type ChunkIter<'a, K, V> =
    core::iter::Flatten<core::slice::Iter<'a, Vec<Option<(K, V)>>>>;
type ChunkIterMut<'a, K, V> =
    core::iter::Flatten<core::slice::IterMut<'a, Vec<Option<(K, V)>>>>;

impl<K, V> EntryStore<K, V> for ChunkedArrayStore<K, V> {
    type Iter<'a>
        = Live<ChunkIter<'a, K, V>>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    type IterMut<'a>
        = LiveMut<ChunkIterMut<'a, K, V>>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    fn with_capacity(capacity: usize) -> Self {
        Self {
            chunks: Vec::with_capacity(capacity.div_ceil(CHUNK_LEN)),
            next: 0,
            live: 0,
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.live
    }

    #[inline]
    fn next_index(&self) -> usize {
        self.next
    }

    #[inline]
    fn get(&self, index: usize) -> (&K, &V) {
        match self.slot(index) {
            Some(Some((k, v))) => (k, v),
            _ => invalid_index(index),
        }
    }

    #[inline]
    fn get_mut(&mut self, index: usize) -> (&K, &mut V) {
        match self.slot_mut(index) {
            Some(Some((k, v))) => (&*k, v),
            _ => invalid_index(index),
        }
    }

    fn push(&mut self, key: K, value: V) -> usize {
        let index = self.next;
        let (chunk, _) = Self::locate(index);
        if chunk == self.chunks.len() {
            self.chunks.push(Vec::with_capacity(CHUNK_LEN));
        }
        self.chunks[chunk].push(Some((key, value)));
        self.next += 1;
        self.live += 1;
        index
    }

    fn remove(&mut self, index: usize) -> (K, V) {
        match self.slot_mut(index).and_then(Option::take) {
            Some(record) => {
                self.live -= 1;
                record
            }
            None => invalid_index(index),
        }
    }

    fn clear(&mut self) {
        self.chunks.clear();
        self.next = 0;
        self.live = 0;
    }

    fn compact(&mut self) -> Vec<usize> {
        let old = core::mem::take(&mut self.chunks);
        let mut fresh = Self::with_capacity(self.live);
        let remap = squeeze(old.into_iter().flatten(), |(k, v)| {
            fresh.push(k, v);
        });
        debug_assert_eq!(fresh.live, self.live);
        *self = fresh;
        remap
    }

    fn iter(&self) -> Self::Iter<'_> {
        Live {
            inner: self.chunks.iter().flatten(),
        }
    }

    fn iter_mut(&mut self) -> Self::IterMut<'_> {
        LiveMut {
            inner: self.chunks.iter_mut().flatten(),
        }
    }
}
