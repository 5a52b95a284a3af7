#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Dense record storage addressed by the indices stored in slots.
///
/// Provides the [`EntryStore`](entry_store::EntryStore) trait and its two
/// backends, a single growable array and a list of fixed-size chunks.
pub mod entry_store;

/// A HashMap implementation using Robin Hood hashing over packed slots.
///
/// This module provides a `HashMap` that pairs a `SlotTable` with an entry
/// store and a key strategy, and exposes a standard key-value map interface.
pub mod hash_map;

mod hash_map_proptest;

/// A hash set implementation on top of [`HashMap`].
pub mod hash_set;

pub mod slot;

/// The open-addressing table of packed slot words.
pub mod slot_table;

/// Hash and equality strategies for keys.
pub mod strategy;

pub use entry_store::ChunkedArrayStore;
pub use entry_store::EntryStore;
pub use entry_store::SingleArrayStore;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use slot_table::SlotTable;
pub use strategy::KeyStrategy;
