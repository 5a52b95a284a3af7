use core::fmt::Debug;

use crate::entry_store::EntryStore;
use crate::entry_store::SingleArrayStore;
use crate::hash_map::HashMap;
use crate::hash_map::Keys;
use crate::strategy::KeyStrategy;
use crate::strategy::Natural;

/// A hash set backed by a [`HashMap`] with unit values.
///
/// `T` is hashed and compared through the strategy `S`; records are kept in
/// the entry store `E`, exactly as for the map.
///
/// # Examples
///
/// ```rust
/// use dense_robin::HashSet;
///
/// let mut set: HashSet<&str> = HashSet::new();
/// assert!(set.insert("a"));
/// assert!(!set.insert("a"));
/// assert!(set.contains(&"a"));
/// assert!(set.remove(&"a"));
/// assert!(set.is_empty());
/// ```
pub struct HashSet<T, S = Natural, E = SingleArrayStore<T, ()>> {
    map: HashMap<T, (), S, E>,
}

impl<T, S, E> Clone for HashSet<T, S, E>
where
    S: Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
        }
    }
}

impl<T, S, E> PartialEq for HashSet<T, S, E>
where
    S: KeyStrategy<T>,
    E: EntryStore<T, ()>,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }
}

impl<T, S, E> Eq for HashSet<T, S, E>
where
    S: KeyStrategy<T>,
    E: EntryStore<T, ()>,
{
}

impl<T, S, E> Debug for HashSet<T, S, E>
where
    T: Debug,
    S: KeyStrategy<T>,
    E: EntryStore<T, ()>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, S, E> HashSet<T, S, E>
where
    S: KeyStrategy<T>,
    E: EntryStore<T, ()>,
{
    /// Creates an empty set using `strategy` to hash and compare values.
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            map: HashMap::with_strategy(strategy),
        }
    }

    /// Creates an empty set with at least `capacity` slots.
    pub fn with_capacity_and_strategy(capacity: usize, strategy: S) -> Self {
        Self {
            map: HashMap::with_capacity_and_strategy(capacity, strategy),
        }
    }

    /// Returns the number of values in the set.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the set contains no values.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the number of slots in the underlying table.
    pub fn capacity(&self) -> usize {
        self.map.capacity()
    }

    /// Removes all values, keeping the slot allocation.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Reserves room for at least `additional` more values without growing.
    pub fn reserve(&mut self, additional: usize) {
        self.map.reserve(additional);
    }

    /// Adds a value to the set.
    ///
    /// Returns `true` if the value was not already present. An equal value
    /// already in the set is kept as is.
    pub fn insert(&mut self, value: T) -> bool {
        let mut inserted = false;
        self.map.get_or_insert_with(value, || inserted = true);
        inserted
    }

    /// Returns `true` if the set contains the value.
    pub fn contains(&self, value: &T) -> bool {
        self.map.contains_key(value)
    }

    /// Returns a reference to the stored value equal to `value`.
    pub fn get(&self, value: &T) -> Option<&T> {
        self.map.get_key_value(value).map(|(k, _)| k)
    }

    /// Removes a value from the set, returning whether it was present.
    pub fn remove(&mut self, value: &T) -> bool {
        self.map.remove(value).is_some()
    }

    /// Removes and returns the stored value equal to `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dense_robin::HashSet;
    ///
    /// let mut set: HashSet<String> = HashSet::new();
    /// set.insert("x".to_string());
    /// assert_eq!(set.take(&"x".to_string()), Some("x".to_string()));
    /// assert_eq!(set.take(&"x".to_string()), None);
    /// ```
    pub fn take(&mut self, value: &T) -> Option<T> {
        self.map.remove_entry(value).map(|(k, _)| k)
    }

    /// Returns an iterator over the values of the set.
    pub fn iter(&self) -> Iter<'_, T, E> {
        Iter {
            inner: self.map.keys(),
        }
    }
}

impl<T, S, E> HashSet<T, S, E>
where
    S: KeyStrategy<T> + Default,
    E: EntryStore<T, ()>,
{
    /// Creates an empty set with the default strategy.
    pub fn new() -> Self {
        Self::with_strategy(S::default())
    }

    /// Creates an empty set with at least `capacity` slots and the default
    /// strategy.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_strategy(capacity, S::default())
    }
}

impl<T, S, E> Default for HashSet<T, S, E>
where
    S: KeyStrategy<T> + Default,
    E: EntryStore<T, ()>,
{
    fn default() -> Self {
        Self::new()
    }
}

/// An iterator over the values of a `HashSet`.
pub struct Iter<'a, T, E>
where
    E: EntryStore<T, ()> + 'a,
    T: 'a,
{
    inner: Keys<'a, T, (), E>,
}

impl<'a, T, E> Iterator for Iter<'a, T, E>
where
    E: EntryStore<T, ()> + 'a,
    T: 'a,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T, S, E> IntoIterator for &'a HashSet<T, S, E>
where
    S: KeyStrategy<T>,
    E: EntryStore<T, ()>,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S, E> FromIterator<T> for HashSet<T, S, E>
where
    S: KeyStrategy<T> + Default,
    E: EntryStore<T, ()>,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<T, S, E> Extend<T> for HashSet<T, S, E>
where
    S: KeyStrategy<T>,
    E: EntryStore<T, ()>,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for value in iter {
            self.insert(value);
        }
    }
}
