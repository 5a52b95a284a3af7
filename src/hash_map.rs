use core::fmt::Debug;
use core::marker::PhantomData;

use crate::entry_store::EntryStore;
use crate::entry_store::SingleArrayStore;
use crate::slot::MAX_PROBE;
use crate::slot_table::Lookup;
use crate::slot_table::SlotTable;
use crate::slot_table::VacantSlot;
use crate::strategy::KeyStrategy;
use crate::strategy::Natural;

/// A Robin Hood hash map that keeps its probe metadata in one packed `u64`
/// per slot and its records in a separate dense [`EntryStore`].
///
/// - `S` decides how keys are hashed and compared (see
///   [`strategy`](crate::strategy)). The default delegates to `Hash + Eq`.
/// - `E` decides how records are stored. The default is one contiguous
///   vector; [`ChunkedArrayStore`](crate::entry_store::ChunkedArrayStore)
///   never moves records when it grows.
///
/// # Performance Characteristics
///
/// - **Memory**: 8 bytes per slot of metadata at a load factor of at most
///   87.5%, plus one `Option<(K, V)>` per record. Full hashes are never
///   stored; growth recovers them from the slot words.
/// - **Removal**: backward-shift, so there are no tombstones and lookups never
///   degrade after heavy churn.
///
/// # Examples
///
/// ```rust
/// use dense_robin::HashMap;
///
/// let mut map: HashMap<&str, i32> = HashMap::new();
/// map.insert("a", 1);
/// map.insert("b", 2);
///
/// assert_eq!(map.get(&"a"), Some(&1));
/// assert_eq!(map.remove(&"b"), Some(2));
/// assert_eq!(map.len(), 1);
/// ```
pub struct HashMap<K, V, S = Natural, E = SingleArrayStore<K, V>> {
    table: SlotTable,
    store: E,
    strategy: S,
    _marker: PhantomData<(K, V)>,
}

impl<K, V, S, E> Clone for HashMap<K, V, S, E>
where
    S: Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            store: self.store.clone(),
            strategy: self.strategy.clone(),
            _marker: PhantomData,
        }
    }
}

impl<K, V, S, E> Debug for HashMap<K, V, S, E>
where
    K: Debug,
    V: Debug,
    E: EntryStore<K, V>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.store.iter()).finish()
    }
}

impl<K, V, S, E> HashMap<K, V, S, E>
where
    S: KeyStrategy<K>,
    E: EntryStore<K, V>,
{
    /// Creates an empty map using `strategy` to hash and compare keys.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dense_robin::HashMap;
    /// use dense_robin::strategy::Fibonacci;
    ///
    /// let mut map: HashMap<u64, &str, _> = HashMap::with_strategy(Fibonacci);
    /// map.insert(7, "seven");
    /// assert_eq!(map.get(&7), Some(&"seven"));
    /// ```
    pub fn with_strategy(strategy: S) -> Self {
        Self::with_capacity_and_strategy(0, strategy)
    }

    /// Creates an empty map with at least `capacity` slots.
    ///
    /// The slot count is rounded up to a power of two and to the minimum table
    /// size of 8. A capacity of zero allocates no slots until the first
    /// insertion.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dense_robin::HashMap;
    /// use dense_robin::strategy::RawInteger;
    ///
    /// let map: HashMap<u32, (), _> = HashMap::with_capacity_and_strategy(100, RawInteger);
    /// assert_eq!(map.capacity(), 128);
    /// ```
    pub fn with_capacity_and_strategy(capacity: usize, strategy: S) -> Self {
        let table = SlotTable::with_capacity(capacity);
        Self {
            store: E::with_capacity(table.capacity()),
            table,
            strategy,
            _marker: PhantomData,
        }
    }

    /// Returns the strategy used to hash and compare keys.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        debug_assert_eq!(self.store.len(), self.table.len());
        self.store.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of slots in the table.
    ///
    /// The map grows before an insertion that would leave 1/8 of the slots or
    /// fewer free, so at most `capacity() * 7 / 8` entries fit without
    /// growing.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Removes all entries, keeping the slot allocation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dense_robin::HashMap;
    ///
    /// let mut map: HashMap<i32, &str> = HashMap::new();
    /// map.insert(1, "a");
    /// let capacity = map.capacity();
    ///
    /// map.clear();
    /// assert!(map.is_empty());
    /// assert_eq!(map.capacity(), capacity);
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
        self.store.clear();
    }

    /// Reserves room for at least `additional` more entries, so they can be
    /// inserted without growing.
    pub fn reserve(&mut self, additional: usize) {
        let required = self
            .len()
            .checked_add(additional)
            .expect("capacity overflow");
        self.table.reserve(required);
    }

    #[inline]
    fn lookup(&self, hash: u64, key: &K) -> Lookup {
        let store = &self.store;
        let strategy = &self.strategy;
        self.table
            .lookup(hash, |index| strategy.equals(store.key(index), key))
    }

    #[inline]
    fn find(&self, key: &K) -> Option<(usize, usize)> {
        let hash = self.strategy.hash(key);
        let store = &self.store;
        let strategy = &self.strategy;
        self.table
            .find(hash, |index| strategy.equals(store.key(index), key))
    }

    /// Makes room for one more slot and one more dense index.
    ///
    /// The entry index lives in the low `log2(capacity)` bits of a slot, so
    /// once the store has handed out every index the table can address, the
    /// holes left by removals are squeezed out and the slots are rewritten.
    /// The table keeps at least 1/8 of its slots free, so that many pushes
    /// separate two compactions.
    fn reserve_one(&mut self) {
        if self.table.needs_growth() {
            self.table.grow();
        }
        if self.store.next_index() > self.table.index_mask() {
            let remap = self.store.compact();
            self.table.remap_entries(&remap);
        }
    }

    /// Returns an insertion point for `hash` whose Robin Hood displacement
    /// keeps every probe count representable.
    #[inline]
    fn insertable(&mut self, vacant: VacantSlot, hash: u64) -> VacantSlot {
        if self.table.can_insert(vacant) {
            vacant
        } else {
            self.grow_for_probe_limit(hash)
        }
    }

    /// Grows until `hash` can be inserted. Growth moves apart any two words
    /// whose packed hashes differ, so it only gives up once more than
    /// [`MAX_PROBE`] keys share a packed hash with the new one.
    #[cold]
    #[inline(never)]
    fn grow_for_probe_limit(&mut self, hash: u64) -> VacantSlot {
        loop {
            let identical = self.table.count_identical(hash);
            assert!(
                identical < MAX_PROBE as usize,
                "{} keys share the hash {:#x}, more than a probe sequence of {MAX_PROBE} slots \
                 can hold: the key strategy produces a degenerate hash distribution",
                identical + 1,
                hash,
            );
            self.table.grow();

            let vacant = self.table.vacant_for(hash);
            if self.table.can_insert(vacant) {
                return vacant;
            }
        }
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map did not have this key present, `None` is returned. If it
    /// did, the value is replaced in place and the old value is returned; the
    /// stored key is kept.
    ///
    /// # Panics
    ///
    /// Panics if more than 31 keys share the same 59-bit hash, since growing
    /// the table can never separate them.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dense_robin::HashMap;
    ///
    /// let mut map: HashMap<i32, &str> = HashMap::new();
    /// assert_eq!(map.insert(37, "a"), None);
    /// assert_eq!(map.insert(37, "b"), Some("a"));
    /// assert_eq!(map.get(&37), Some(&"b"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.entry(key) {
            Entry::Occupied(mut entry) => Some(entry.insert(value)),
            Entry::Vacant(entry) => {
                entry.insert(value);
                None
            }
        }
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dense_robin::HashMap;
    ///
    /// let mut map: HashMap<i32, &str> = HashMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    pub fn get(&self, key: &K) -> Option<&V> {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Returns the stored key and its value.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let (_, index) = self.find(key)?;
        Some(self.store.get(index))
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let (_, index) = self.find(key)?;
        Some(self.store.get_mut(index).1)
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Returns the value for `key`, or `default` when the key is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dense_robin::HashMap;
    ///
    /// let mut map: HashMap<i32, &str> = HashMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.get_or(&1, &"z"), &"a");
    /// assert_eq!(map.get_or(&2, &"z"), &"z");
    /// ```
    pub fn get_or<'a>(&'a self, key: &K, default: &'a V) -> &'a V {
        self.get(key).unwrap_or(default)
    }

    /// Returns a copy of the value for `key`, or `V::default()` when the key
    /// is absent. The map is not modified.
    pub fn get_or_default(&self, key: &K) -> V
    where
        V: Clone + Default,
    {
        self.get(key).cloned().unwrap_or_default()
    }

    /// Returns a mutable reference to the value for `key`, inserting the value
    /// produced by `default` first if the key is absent.
    ///
    /// # Panics
    ///
    /// See [`insert`](Self::insert).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dense_robin::HashMap;
    ///
    /// let mut map: HashMap<&str, Vec<i32>> = HashMap::new();
    /// map.get_or_insert_with("a", Vec::new).push(1);
    /// map.get_or_insert_with("a", || unreachable!()).push(2);
    /// assert_eq!(map.get(&"a"), Some(&vec![1, 2]));
    /// ```
    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        self.reserve_one();
        let hash = self.strategy.hash(&key);

        let (found, vacant) = match self.lookup(hash, &key) {
            Lookup::Found { entry_index, .. } => (Some(entry_index), None),
            Lookup::Vacant(vacant) => (None, Some(self.insertable(vacant, hash))),
        };

        let (index, value) = self.store.get_or_append(found, key, default);
        if let Some(vacant) = vacant {
            self.table.insert_at(vacant, hash, index);
        }
        value
    }

    /// Returns a mutable reference to the value for `key`, inserting
    /// `V::default()` first if the key is absent.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    /// Removes a key from the map, returning its value if it was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dense_robin::HashMap;
    ///
    /// let mut map: HashMap<i32, &str> = HashMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes a key from the map, returning the stored key and value if the
    /// key was present.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let (position, _) = self.find(key)?;
        let index = self.table.remove_at(position);
        Some(self.store.remove(index))
    }

    /// Gets the given key's corresponding entry in the map for in-place
    /// manipulation.
    ///
    /// This may grow the table even if the key turns out to be present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dense_robin::HashMap;
    ///
    /// let mut map: HashMap<&str, u32> = HashMap::new();
    /// for word in ["a", "b", "a"] {
    ///     *map.entry(word).or_insert(0) += 1;
    /// }
    /// assert_eq!(map.get(&"a"), Some(&2));
    /// assert_eq!(map.get(&"b"), Some(&1));
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S, E> {
        self.reserve_one();
        let hash = self.strategy.hash(&key);
        match self.lookup(hash, &key) {
            Lookup::Found {
                position,
                entry_index,
            } => Entry::Occupied(OccupiedEntry {
                map: self,
                position,
                index: entry_index,
            }),
            Lookup::Vacant(slot) => Entry::Vacant(VacantEntry {
                map: self,
                hash,
                key,
                slot,
            }),
        }
    }

    /// Returns an iterator over the key-value pairs of the map.
    ///
    /// Pairs are yielded in insertion order. Removals leave holes in the
    /// entry store that are skipped, and compacting the store keeps the
    /// remaining records in order. Replacing a value keeps the key's place.
    pub fn iter(&self) -> Iter<'_, K, V, E> {
        Iter {
            inner: self.store.iter(),
            remaining: self.len(),
            _marker: PhantomData,
        }
    }

    /// Returns an iterator over the key-value pairs with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, E> {
        let remaining = self.len();
        IterMut {
            inner: self.store.iter_mut(),
            remaining,
            _marker: PhantomData,
        }
    }

    /// Returns an iterator over the keys of the map.
    pub fn keys(&self) -> Keys<'_, K, V, E> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values of the map.
    pub fn values(&self) -> Values<'_, K, V, E> {
        Values { inner: self.iter() }
    }

    /// Returns an iterator over mutable references to the values of the map.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V, E> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Returns the slot table for inspection.
    #[cfg(any(test, feature = "stats"))]
    pub fn slot_table(&self) -> &SlotTable {
        &self.table
    }

    /// Returns the entry store for inspection.
    #[cfg(any(test, feature = "stats"))]
    pub fn entry_store(&self) -> &E {
        &self.store
    }

    /// Computes a histogram of probe counts; see
    /// [`SlotTable::probe_histogram`].
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> alloc::vec::Vec<usize> {
        self.table.probe_histogram()
    }

    /// Returns utilization and probe statistics; see
    /// [`SlotTable::debug_stats`].
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> crate::slot_table::DebugStats {
        self.table.debug_stats()
    }

    /// Checks every structural property the engine relies on.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let table = &self.table;
        let mask = table.index_mask();
        let raw = table.raw_slots();

        let mut seen = alloc::vec![false; self.store.next_index()];
        for info in table.slots() {
            let (key, _) = self.store.get(info.entry_index);
            let hash = self.strategy.hash(key);
            assert_eq!(info.ideal_index, hash as usize & mask, "slot {info:?}");
            assert_eq!(
                info.hash_fragment,
                crate::slot::PackedSlot::fragment_of(hash, mask),
                "slot {info:?}"
            );
            assert!(
                !core::mem::replace(&mut seen[info.entry_index], true),
                "entry index {} stored twice",
                info.entry_index
            );

            let next = raw[(info.position + 1) & mask];
            assert!(
                next.probe_count() <= info.probe_count + 1,
                "probe counts jump after slot {info:?}"
            );
        }

        assert_eq!(table.len(), self.store.len());
        assert_eq!(seen.iter().filter(|&&s| s).count(), self.store.len());
        assert!(table.is_placeholder() || table.len() < table.capacity());
        assert!(raw.iter().any(|slot| slot.is_empty()));
    }
}

impl<K, V, S, E> HashMap<K, V, S, E>
where
    S: KeyStrategy<K> + Default,
    E: EntryStore<K, V>,
{
    /// Creates an empty map with the default strategy.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dense_robin::HashMap;
    ///
    /// let map: HashMap<i32, String> = HashMap::new();
    /// assert!(map.is_empty());
    /// assert_eq!(map.capacity(), 0);
    /// ```
    pub fn new() -> Self {
        Self::with_strategy(S::default())
    }

    /// Creates an empty map with at least `capacity` slots and the default
    /// strategy.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_strategy(capacity, S::default())
    }
}

impl<K, V, S, E> Default for HashMap<K, V, S, E>
where
    S: KeyStrategy<K> + Default,
    E: EntryStore<K, V>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S, E> PartialEq for HashMap<K, V, S, E>
where
    V: PartialEq,
    S: KeyStrategy<K>,
    E: EntryStore<K, V>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|other| v == other))
    }
}

impl<K, V, S, E> Eq for HashMap<K, V, S, E>
where
    V: Eq,
    S: KeyStrategy<K>,
    E: EntryStore<K, V>,
{
}

impl<K, V, S, E> Extend<(K, V)> for HashMap<K, V, S, E>
where
    S: KeyStrategy<K>,
    E: EntryStore<K, V>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S, E> FromIterator<(K, V)> for HashMap<K, V, S, E>
where
    S: KeyStrategy<K> + Default,
    E: EntryStore<K, V>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<'a, K, V, S, E> IntoIterator for &'a HashMap<K, V, S, E>
where
    S: KeyStrategy<K>,
    E: EntryStore<K, V>,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, E> IntoIterator for &'a mut HashMap<K, V, S, E>
where
    S: KeyStrategy<K>,
    E: EntryStore<K, V>,
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// A view into a single entry in the map, which may either be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashMap`].
///
/// [`entry`]: HashMap::entry
pub enum Entry<'a, K, V, S, E> {
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V, S, E>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V, S, E>),
}

impl<'a, K, V, S, E> Entry<'a, K, V, S, E>
where
    S: KeyStrategy<K>,
    E: EntryStore<K, V>,
{
    /// Inserts a default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts a value computed from a closure if the entry is vacant and
    /// returns a mutable reference.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Inserts the default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(Default::default)
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

/// A view into a vacant entry in the map.
pub struct VacantEntry<'a, K, V, S, E> {
    map: &'a mut HashMap<K, V, S, E>,
    hash: u64,
    key: K,
    slot: VacantSlot,
}

impl<'a, K, V, S, E> VacantEntry<'a, K, V, S, E>
where
    S: KeyStrategy<K>,
    E: EntryStore<K, V>,
{
    /// Gets a reference to the key that would be used when inserting a value.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Take ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the value into the map and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        let VacantEntry {
            map,
            hash,
            key,
            slot,
        } = self;

        let slot = map.insertable(slot, hash);
        let index = map.store.push(key, value);
        map.table.insert_at(slot, hash, index);
        map.store.get_mut(index).1
    }
}

/// A view into an occupied entry in the map.
pub struct OccupiedEntry<'a, K, V, S, E> {
    map: &'a mut HashMap<K, V, S, E>,
    position: usize,
    index: usize,
}

impl<'a, K, V, S, E> OccupiedEntry<'a, K, V, S, E>
where
    S: KeyStrategy<K>,
    E: EntryStore<K, V>,
{
    /// Gets a reference to the key in the entry.
    pub fn key(&self) -> &K {
        self.map.store.key(self.index)
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        self.map.store.get(self.index).1
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        self.map.store.get_mut(self.index).1
    }

    /// Converts the entry into a mutable reference to the value.
    pub fn into_mut(self) -> &'a mut V {
        self.map.store.get_mut(self.index).1
    }

    /// Inserts a value into the entry and returns the old value.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the entry from the map and returns the value.
    pub fn remove(self) -> V {
        self.remove_entry().1
    }

    /// Removes the entry from the map and returns the key and value.
    pub fn remove_entry(self) -> (K, V) {
        let index = self.map.table.remove_at(self.position);
        debug_assert_eq!(index, self.index);
        self.map.store.remove(index)
    }
}

/// An iterator over the key-value pairs of a `HashMap`.
pub struct Iter<'a, K, V, E>
where
    E: EntryStore<K, V> + 'a,
    K: 'a,
    V: 'a,
{
    inner: E::Iter<'a>,
    remaining: usize,
    _marker: PhantomData<&'a (K, V)>,
}

impl<'a, K, V, E> Iterator for Iter<'a, K, V, E>
where
    E: EntryStore<K, V> + 'a,
    K: 'a,
    V: 'a,
{
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next()?;
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V, E> ExactSizeIterator for Iter<'a, K, V, E>
where
    E: EntryStore<K, V> + 'a,
    K: 'a,
    V: 'a,
{
}

/// A mutable iterator over the key-value pairs of a `HashMap`.
pub struct IterMut<'a, K, V, E>
where
    E: EntryStore<K, V> + 'a,
    K: 'a,
    V: 'a,
{
    inner: E::IterMut<'a>,
    remaining: usize,
    _marker: PhantomData<&'a mut (K, V)>,
}

impl<'a, K, V, E> Iterator for IterMut<'a, K, V, E>
where
    E: EntryStore<K, V> + 'a,
    K: 'a,
    V: 'a,
{
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next()?;
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V, E> ExactSizeIterator for IterMut<'a, K, V, E>
where
    E: EntryStore<K, V> + 'a,
    K: 'a,
    V: 'a,
{
}

/// An iterator over the keys of a `HashMap`.
pub struct Keys<'a, K, V, E>
where
    E: EntryStore<K, V> + 'a,
    K: 'a,
    V: 'a,
{
    inner: Iter<'a, K, V, E>,
}

impl<'a, K, V, E> Iterator for Keys<'a, K, V, E>
where
    E: EntryStore<K, V> + 'a,
    K: 'a,
    V: 'a,
{
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An iterator over the values of a `HashMap`.
pub struct Values<'a, K, V, E>
where
    E: EntryStore<K, V> + 'a,
    K: 'a,
    V: 'a,
{
    inner: Iter<'a, K, V, E>,
}

impl<'a, K, V, E> Iterator for Values<'a, K, V, E>
where
    E: EntryStore<K, V> + 'a,
    K: 'a,
    V: 'a,
{
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// A mutable iterator over the values of a `HashMap`.
pub struct ValuesMut<'a, K, V, E>
where
    E: EntryStore<K, V> + 'a,
    K: 'a,
    V: 'a,
{
    inner: IterMut<'a, K, V, E>,
}

impl<'a, K, V, E> Iterator for ValuesMut<'a, K, V, E>
where
    E: EntryStore<K, V> + 'a,
    K: 'a,
    V: 'a,
{
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::hash::BuildHasher;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use rand::rngs::SmallRng;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::entry_store::ChunkedArrayStore;
    use crate::strategy::Fibonacci;
    use crate::strategy::RawInteger;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k1: rng.try_next_u64().unwrap_or(0),
                k2: rng.try_next_u64().unwrap_or(0),
            }
        }
    }

    type SipMap<K, V> = HashMap<K, V, Natural<SipHashBuilder>>;

    /// Hashes every key to the same value.
    #[derive(Clone, Copy, Default)]
    struct Constant;

    impl KeyStrategy<u32> for Constant {
        fn hash(&self, _: &u32) -> u64 {
            0
        }

        fn equals(&self, a: &u32, b: &u32) -> bool {
            a == b
        }
    }

    #[test]
    fn test_new_and_with_strategy() {
        let map: SipMap<i32, String> = HashMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert_eq!(map.capacity(), 0);

        let map2: SipMap<i32, String> =
            HashMap::with_strategy(Natural::with_hasher(SipHashBuilder::default()));
        assert!(map2.is_empty());
        map2.assert_invariants();
    }

    #[test]
    fn test_with_capacity() {
        let map: SipMap<i32, String> = HashMap::with_capacity(100);
        assert_eq!(map.capacity(), 128);
        assert!(map.is_empty());

        let map2: SipMap<i32, String> = HashMap::with_capacity(3);
        assert_eq!(map2.capacity(), 8);
    }

    #[test]
    fn test_insert_and_get() {
        let mut map: SipMap<i32, String> = HashMap::new();

        assert_eq!(map.insert(1, "hello".to_string()), None);
        assert_eq!(map.len(), 1);
        assert!(!map.is_empty());
        assert_eq!(map.capacity(), 8);

        assert_eq!(map.get(&1), Some(&"hello".to_string()));
        assert_eq!(map.get(&2), None);

        assert_eq!(
            map.insert(1, "world".to_string()),
            Some("hello".to_string())
        );
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some(&"world".to_string()));
        map.assert_invariants();
    }

    #[test]
    fn test_get_mut_and_key_value() {
        let mut map: SipMap<i32, String> = HashMap::new();
        map.insert(1, "hello".to_string());

        if let Some(value) = map.get_mut(&1) {
            value.push_str(" world");
        }

        assert_eq!(map.get(&1), Some(&"hello world".to_string()));
        assert_eq!(map.get_mut(&2), None);
        assert_eq!(
            map.get_key_value(&1),
            Some((&1, &"hello world".to_string()))
        );
        assert!(map.contains_key(&1));
        assert!(!map.contains_key(&2));
    }

    #[test]
    fn test_get_or_and_get_or_default() {
        let mut map: SipMap<&str, u32> = HashMap::new();
        map.insert("a", 5);

        let fallback = 9;
        assert_eq!(map.get_or(&"a", &fallback), &5);
        assert_eq!(map.get_or(&"b", &fallback), &9);
        assert_eq!(map.get_or_default(&"a"), 5);
        assert_eq!(map.get_or_default(&"b"), 0);

        // lookups never insert
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_get_or_insert() {
        let mut map: SipMap<&str, Vec<u32>> = HashMap::new();

        map.get_or_insert_default("a").push(1);
        map.get_or_insert_default("a").push(2);
        map.get_or_insert_with("b", || vec![10]).push(11);
        map.get_or_insert_with("b", || unreachable!()).push(12);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&"a"), Some(&vec![1, 2]));
        assert_eq!(map.get(&"b"), Some(&vec![10, 11, 12]));
        map.assert_invariants();
    }

    #[test]
    fn test_update_keeps_stored_key() {
        // equal under the strategy, distinguishable by address
        let first = String::from("key");
        let second = String::from("key");
        let mut map: SipMap<&String, u32> = HashMap::new();

        map.insert(&first, 1);
        map.insert(&second, 2);

        let (stored, value) = map.get_key_value(&&second).unwrap();
        assert!(core::ptr::eq(*stored, &first));
        assert_eq!(*value, 2);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut map: SipMap<i32, String> = HashMap::new();
        map.insert(1, "hello".to_string());
        map.insert(2, "world".to_string());

        assert_eq!(map.remove(&1), Some("hello".to_string()));
        assert_eq!(map.len(), 1);
        assert!(!map.contains_key(&1));
        assert!(map.contains_key(&2));

        assert_eq!(map.remove(&1), None);
        assert_eq!(map.remove(&3), None);
        map.assert_invariants();
    }

    #[test]
    fn test_remove_entry() {
        let mut map: SipMap<i32, String> = HashMap::new();
        map.insert(1, "hello".to_string());

        assert_eq!(map.remove_entry(&1), Some((1, "hello".to_string())));
        assert_eq!(map.len(), 0);
        assert_eq!(map.remove_entry(&1), None);
    }

    #[test]
    fn test_remove_then_reinsert() {
        let mut map: SipMap<i32, i32> = HashMap::new();
        map.insert(1, 10);
        map.remove(&1);
        assert_eq!(map.insert(1, 20), None);
        assert_eq!(map.get(&1), Some(&20));
    }

    #[test]
    fn test_clear() {
        let mut map: SipMap<i32, String> = HashMap::new();
        map.insert(1, "hello".to_string());
        map.insert(2, "world".to_string());

        let capacity = map.capacity();
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.capacity(), capacity);
        assert!(!map.contains_key(&1));
        assert!(!map.contains_key(&2));

        map.insert(3, "again".to_string());
        assert_eq!(map.get(&3), Some(&"again".to_string()));
        map.assert_invariants();
    }

    #[test]
    fn test_reserve() {
        let mut map: SipMap<i32, i32> = HashMap::new();
        map.reserve(1000);
        let capacity = map.capacity();
        assert!(capacity * 7 / 8 >= 1000);

        for i in 0..1000 {
            map.insert(i, i);
        }
        assert_eq!(map.capacity(), capacity);
    }

    #[test]
    fn test_entry_api() {
        let mut map: SipMap<i32, String> = HashMap::new();

        let value = map.entry(1).or_insert("hello".to_string());
        assert_eq!(value, &"hello".to_string());
        assert_eq!(map.len(), 1);

        let value = map.entry(1).or_insert("world".to_string());
        assert_eq!(value, &"hello".to_string());
        assert_eq!(map.len(), 1);

        map.entry(2).or_insert_with(|| "computed".to_string());
        assert_eq!(map.get(&2), Some(&"computed".to_string()));

        map.entry(1)
            .and_modify(|v| v.push_str(" world"))
            .or_insert("default".to_string());
        assert_eq!(map.get(&1), Some(&"hello world".to_string()));

        assert_eq!(map.entry(3).key(), &3);
        assert!(!map.contains_key(&3));
    }

    #[test]
    fn test_entry_or_default() {
        let mut map: SipMap<i32, Vec<i32>> = HashMap::new();

        map.entry(1).or_default().push(42);
        assert_eq!(map.get(&1), Some(&vec![42]));

        map.entry(1).or_default().push(24);
        assert_eq!(map.get(&1), Some(&vec![42, 24]));
    }

    #[test]
    fn test_occupied_entry() {
        let mut map: SipMap<i32, String> = HashMap::new();
        map.insert(1, "hello".to_string());

        match map.entry(1) {
            Entry::Occupied(mut entry) => {
                assert_eq!(entry.key(), &1);
                assert_eq!(entry.get(), &"hello".to_string());

                *entry.get_mut() = "world".to_string();
                assert_eq!(entry.get(), &"world".to_string());

                let old_value = entry.insert("new".to_string());
                assert_eq!(old_value, "world".to_string());
                assert_eq!(entry.get(), &"new".to_string());

                let (key, value) = entry.remove_entry();
                assert_eq!(key, 1);
                assert_eq!(value, "new".to_string());
            }
            Entry::Vacant(_) => panic!("Expected occupied entry"),
        }

        assert!(map.is_empty());
        map.assert_invariants();
    }

    #[test]
    fn test_vacant_entry() {
        let mut map: SipMap<i32, String> = HashMap::new();

        match map.entry(1) {
            Entry::Vacant(entry) => {
                assert_eq!(entry.key(), &1);

                let value = entry.insert("hello".to_string());
                assert_eq!(value, &"hello".to_string());
            }
            Entry::Occupied(_) => panic!("Expected vacant entry"),
        }

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some(&"hello".to_string()));

        match map.entry(2) {
            Entry::Vacant(entry) => assert_eq!(entry.into_key(), 2),
            Entry::Occupied(_) => panic!("Expected vacant entry"),
        }
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_iterators() {
        let mut map: SipMap<i32, String> = HashMap::new();
        map.insert(1, "one".to_string());
        map.insert(2, "two".to_string());
        map.insert(3, "three".to_string());

        // insertion order
        let pairs: Vec<(i32, String)> = map.iter().map(|(k, v)| (*k, v.clone())).collect();
        assert_eq!(
            pairs,
            vec![
                (1, "one".to_string()),
                (2, "two".to_string()),
                (3, "three".to_string())
            ]
        );
        assert_eq!(map.iter().len(), 3);

        let keys: std::collections::HashSet<i32> = map.keys().copied().collect();
        let expected: std::collections::HashSet<i32> = [1, 2, 3].into_iter().collect();
        assert_eq!(keys, expected);

        let values: std::collections::HashSet<String> = map.values().cloned().collect();
        assert!(values.contains("one"));
        assert!(values.contains("two"));
        assert!(values.contains("three"));

        for value in map.values_mut() {
            value.push('!');
        }
        for (_, value) in &mut map {
            value.push('?');
        }
        assert_eq!(map.get(&2), Some(&"two!?".to_string()));

        map.remove(&2);
        assert_eq!((&map).into_iter().count(), 2);
        assert_eq!(map.iter().size_hint(), (2, Some(2)));
    }

    #[test]
    fn test_multiple_insertions() {
        let mut map: SipMap<i32, String> = HashMap::new();

        for i in 0..100 {
            map.insert(i, format!("value_{}", i));
        }

        assert_eq!(map.len(), 100);

        for i in 0..100 {
            assert_eq!(map.get(&i), Some(&format!("value_{}", i)));
        }
        map.assert_invariants();
    }

    #[test]
    fn test_collision_handling() {
        let mut map: SipMap<i32, i32> = HashMap::new();

        for i in 0..1000 {
            map.insert(i, i * 2);
        }

        assert_eq!(map.len(), 1000);

        for i in 0..1000 {
            assert_eq!(map.get(&i), Some(&(i * 2)));
        }

        for i in (0..1000).step_by(2) {
            assert_eq!(map.remove(&i), Some(i * 2));
        }

        assert_eq!(map.len(), 500);

        for i in (1..1000).step_by(2) {
            assert_eq!(map.get(&i), Some(&(i * 2)));
        }
        for i in (0..1000).step_by(2) {
            assert_eq!(map.get(&i), None);
        }
        map.assert_invariants();
    }

    #[test]
    fn test_string_keys() {
        let mut map: SipMap<String, i32> = HashMap::new();

        map.insert("hello".to_string(), 1);
        map.insert("world".to_string(), 2);
        map.insert("rust".to_string(), 3);

        assert_eq!(map.get(&"hello".to_string()), Some(&1));
        assert_eq!(map.get(&"world".to_string()), Some(&2));
        assert_eq!(map.get(&"rust".to_string()), Some(&3));
        assert_eq!(map.get(&"missing".to_string()), None);
    }

    #[test]
    fn test_default_trait() {
        let map: SipMap<i32, String> = HashMap::default();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn test_clone_eq_debug() {
        let mut map: SipMap<i32, i32> = HashMap::new();
        map.insert(1, 10);
        map.insert(2, 20);

        let mut copy = map.clone();
        assert_eq!(copy, map);
        copy.insert(2, 21);
        assert_ne!(copy, map);
        copy.insert(2, 20);
        copy.insert(3, 30);
        assert_ne!(copy, map);
        copy.remove(&3);
        assert_eq!(copy, map);

        assert_eq!(format!("{:?}", map), "{1: 10, 2: 20}");
    }

    #[test]
    fn test_extend_and_from_iter() {
        let map: SipMap<u32, u32> = (0..50).map(|i| (i, i * i)).collect();
        assert_eq!(map.len(), 50);
        assert_eq!(map.get(&7), Some(&49));

        let mut map = map;
        map.extend((40..60).map(|i| (i, 0)));
        assert_eq!(map.len(), 60);
        assert_eq!(map.get(&45), Some(&0));
        assert_eq!(map.get(&39), Some(&(39 * 39)));
        map.assert_invariants();
    }

    #[test]
    fn colliding_keys_probe_forward() {
        let mut map: HashMap<u64, &str, _> = HashMap::with_capacity_and_strategy(8, RawInteger);
        for (key, value) in [(0, "a"), (8, "b"), (16, "c"), (24, "d")] {
            map.insert(key, value);
        }

        let dump: Vec<(usize, u32)> = map
            .slot_table()
            .slots()
            .map(|s| (s.position, s.probe_count))
            .collect();
        assert_eq!(dump, vec![(0, 1), (1, 2), (2, 3), (3, 4)]);

        let found = map
            .slot_table()
            .slots()
            .find(|s| *map.entry_store().key(s.entry_index) == 16)
            .unwrap();
        assert_eq!(found.probe_count, 3);
        assert_eq!(map.get(&16), Some(&"c"));
        map.assert_invariants();
    }

    #[test]
    fn remove_shifts_cluster_back() {
        let mut map: HashMap<u64, &str, _> = HashMap::with_capacity_and_strategy(8, RawInteger);
        for (key, value) in [(0, "a"), (8, "b"), (16, "c"), (24, "d")] {
            map.insert(key, value);
        }

        assert_eq!(map.remove(&8), Some("b"));

        let dump: Vec<(usize, u32, u64)> = map
            .slot_table()
            .slots()
            .map(|s| (s.position, s.probe_count, *map.entry_store().key(s.entry_index)))
            .collect();
        assert_eq!(dump, vec![(0, 1, 0), (1, 2, 16), (2, 3, 24)]);
        assert_eq!(map.get(&24), Some(&"d"));
        assert_eq!(map.get(&8), None);
        map.assert_invariants();
    }

    #[test]
    fn sequential_keys_grow_to_expected_capacity() {
        let mut map: HashMap<u64, u64, _> = HashMap::with_capacity_and_strategy(8, Fibonacci);
        for i in 0..100 {
            map.insert(i, i);
            map.assert_invariants();
        }

        assert_eq!(map.len(), 100);
        assert_eq!(map.capacity(), 128);

        let mut keys: Vec<u64> = map
            .slot_table()
            .slots()
            .map(|s| *map.entry_store().key(s.entry_index))
            .collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn load_factor_stays_below_seven_eighths() {
        let mut map: SipMap<u32, ()> = HashMap::new();
        for i in 0..3000 {
            map.insert(i, ());
            let stats = map.debug_stats();
            assert!(stats.populated * 8 < stats.capacity * 7 + 8);
            assert!(stats.populated < stats.capacity);
        }
    }

    #[test]
    fn growth_matches_presized_map() {
        let mut rng = SmallRng::seed_from_u64(0x5EED);
        let keys: Vec<u64> = (0..5000).map(|_| rng.random()).collect();

        let mut grown: HashMap<u64, u64, _> = HashMap::with_strategy(Fibonacci);
        let mut presized: HashMap<u64, u64, _> =
            HashMap::with_capacity_and_strategy(16_384, Fibonacci);
        for &k in &keys {
            grown.insert(k, k ^ 1);
            presized.insert(k, k ^ 1);
        }

        assert_eq!(presized.capacity(), 16_384);
        assert_eq!(grown, presized);
        grown.assert_invariants();

        // no false positives right after growth
        for _ in 0..5000 {
            let probe: u64 = rng.random();
            assert_eq!(grown.contains_key(&probe), presized.contains_key(&probe));
        }
    }

    #[test]
    fn no_false_positives_across_resizes() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut map: SipMap<u32, u32> = HashMap::new();
        let mut inserted = std::collections::HashSet::new();

        for _ in 0..2000 {
            let k = rng.random_range(0..1_000_000);
            let before = map.capacity();
            map.insert(k, k);
            inserted.insert(k);

            if map.capacity() != before {
                for _ in 0..200 {
                    let q = rng.random_range(0..1_000_000);
                    assert_eq!(map.contains_key(&q), inserted.contains(&q));
                }
            }
        }
    }

    #[test]
    fn churn_compacts_entry_store() {
        let mut map: HashMap<u32, u32, _> = HashMap::with_capacity_and_strategy(64, Fibonacci);
        for i in 0..40 {
            map.insert(i, i);
        }
        // constant population, ever-growing dense indices
        for i in 40..10_000 {
            map.remove(&(i - 40));
            map.insert(i, i);
        }

        assert_eq!(map.len(), 40);
        assert_eq!(map.capacity(), 64);
        assert!(map.entry_store().next_index() <= 64);
        for i in 9960..10_000 {
            assert_eq!(map.get(&i), Some(&i));
        }
        map.assert_invariants();
    }

    #[test]
    fn chunked_store_behaves_identically() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut single: HashMap<u32, u32, Fibonacci> = HashMap::with_strategy(Fibonacci);
        let mut chunked: HashMap<u32, u32, Fibonacci, ChunkedArrayStore<u32, u32>> =
            HashMap::with_strategy(Fibonacci);

        for _ in 0..5000 {
            let k = rng.random_range(0..800);
            if rng.random_bool(0.3) {
                assert_eq!(single.remove(&k), chunked.remove(&k));
            } else {
                assert_eq!(single.insert(k, k * 3), chunked.insert(k, k * 3));
            }
        }

        assert_eq!(single.len(), chunked.len());
        assert_eq!(single.capacity(), chunked.capacity());
        for (k, v) in single.iter() {
            assert_eq!(chunked.get(k), Some(v));
        }
        chunked.assert_invariants();
    }

    #[test]
    fn degenerate_strategy_grows_before_panicking() {
        let mut map: HashMap<u32, u32, Constant> = HashMap::with_strategy(Constant);
        for i in 0..MAX_PROBE {
            map.insert(i, i);
        }
        assert_eq!(map.len(), MAX_PROBE as usize);
        map.assert_invariants();
    }

    #[test]
    #[should_panic(expected = "degenerate hash distribution")]
    fn degenerate_strategy_eventually_panics() {
        let mut map: HashMap<u32, u32, Constant> = HashMap::with_strategy(Constant);
        for i in 0..=MAX_PROBE {
            map.insert(i, i);
        }
    }

    #[test]
    fn strided_raw_keys_grow_until_separated() {
        let mut raw: HashMap<u64, u64, RawInteger> = HashMap::with_strategy(RawInteger);
        let mut natural: SipMap<u64, u64> = HashMap::new();
        for i in 0..40 {
            raw.insert(i * 256, i);
            natural.insert(i * 256, i);
        }

        assert_eq!(raw.len(), 40);
        assert!(raw.capacity() <= 1024);
        for i in 0..40 {
            assert_eq!(raw.get(&(i * 256)), natural.get(&(i * 256)));
        }
        assert_eq!(raw.get(&128), None);
        raw.assert_invariants();
    }

    #[test]
    fn wide_strides_keep_working() {
        let mut map: HashMap<u64, u64, RawInteger> = HashMap::with_strategy(RawInteger);
        for i in 0..100 {
            map.insert(i << 16, i);
        }
        for i in 0..100 {
            assert_eq!(map.remove(&(i << 16)), Some(i));
        }
        assert!(map.is_empty());
        map.assert_invariants();
    }

    #[test]
    fn iteration_keeps_insertion_order_across_removals() {
        let mut map: HashMap<u32, u32, Fibonacci> = HashMap::with_strategy(Fibonacci);
        for i in 0..20 {
            map.insert(i, i);
        }
        for i in (0..20).step_by(2) {
            map.remove(&i);
        }
        map.insert(100, 100);
        map.insert(3, 33);

        let keys: Vec<u32> = map.keys().copied().collect();
        let mut expected: Vec<u32> = (1..20).step_by(2).collect();
        expected.push(100);
        assert_eq!(keys, expected);
        assert_eq!(map.get(&3), Some(&33));
    }

    #[test]
    fn iteration_keeps_insertion_order_across_compaction() {
        let mut map: SipMap<u32, u32> = HashMap::with_capacity(16);
        for i in 0..10 {
            map.insert(i, i);
        }
        for i in 10..200 {
            map.remove(&(i - 10));
            map.insert(i, i);
        }

        assert_eq!(map.capacity(), 16);
        // dense indices were reclaimed at least once
        assert!(map.entry_store().next_index() <= 16);
        let keys: Vec<u32> = map.keys().copied().collect();
        assert_eq!(keys, (190..200).collect::<Vec<_>>());
        let pairs: Vec<(u32, u32)> = map.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(pairs, (190..200).map(|i| (i, i)).collect::<Vec<_>>());
    }

    #[test]
    fn reserving_nothing_allocates_nothing() {
        let mut map: SipMap<u32, u32> = HashMap::new();
        map.reserve(0);
        assert_eq!(map.capacity(), 0);

        map.extend(core::iter::empty());
        assert_eq!(map.capacity(), 0);
        assert!(map.slot_table().is_placeholder());

        map.insert(1, 1);
        assert_eq!(map.capacity(), 8);
    }

    #[test]
    fn test_complex_values() {
        let mut map: SipMap<String, Vec<i32>> = HashMap::new();

        let vec1 = vec![1, 2, 3];
        let vec2 = vec![4, 5, 6];

        map.insert("first".to_string(), vec1.clone());
        map.insert("second".to_string(), vec2.clone());

        assert_eq!(map.get(&"first".to_string()), Some(&vec1));
        assert_eq!(map.get(&"second".to_string()), Some(&vec2));

        if let Some(v) = map.get_mut(&"first".to_string()) {
            v.push(4);
        }

        assert_eq!(map.get(&"first".to_string()), Some(&vec![1, 2, 3, 4]));
    }
}
