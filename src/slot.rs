//! The packed per-slot metadata word.
//!
//! Every slot of the [`SlotTable`](crate::slot_table::SlotTable) is a single
//! `u64` split into three non-overlapping fields:
//!
//! ```text
//!  63     59 58                        shift  shift-1           0
//! +---------+-------------------------------+-------------------+
//! |  probe  |         hash fragment         |    entry index    |
//! +---------+-------------------------------+-------------------+
//! ```
//!
//! `shift` is `log2(capacity)`, so the split between the fragment and the
//! entry index moves every time the table doubles. The low `shift` bits of the
//! hash are implied by the slot's ideal position, which is why they can be
//! reused for the entry index without losing information.

/// Number of bits used for the probe count.
pub const PROBE_BITS: u32 = 5;

/// Largest probe count representable in a packed slot.
pub const MAX_PROBE: u32 = (1 << PROBE_BITS) - 1;

/// First bit of the probe count field. Everything below it belongs to the
/// hash fragment and entry index.
pub(crate) const PROBE_SHIFT: u32 = u64::BITS - PROBE_BITS;

/// Mask selecting the bits of a hash that survive packing.
pub(crate) const HASH_MASK: u64 = (1 << PROBE_SHIFT) - 1;

/// A packed `ProbeCount | HashFragment | EntryIndex` word.
///
/// The all-zero word is the empty sentinel: a probe count of zero never
/// appears in an occupied slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct PackedSlot(u64);

impl PackedSlot {
    /// The empty slot.
    pub const EMPTY: PackedSlot = PackedSlot(0);

    /// Packs the three fields into one word.
    ///
    /// `hash` may be the full strategy hash; bits above the fragment range and
    /// bits covered by `index_mask` are discarded.
    ///
    /// # Panics
    ///
    /// Panics if `probe` is not in `1..=MAX_PROBE`. A probe count that does not
    /// fit the field would silently corrupt the fragment, so this is checked
    /// in release builds too.
    #[inline]
    pub fn pack(probe: u32, hash: u64, entry_index: usize, index_mask: usize) -> Self {
        assert!(
            (1..=MAX_PROBE).contains(&probe),
            "probe count {probe} does not fit the {PROBE_BITS}-bit probe field"
        );
        debug_assert!(entry_index <= index_mask, "entry index exceeds index field");

        PackedSlot(
            (u64::from(probe) << PROBE_SHIFT)
                | Self::fragment_of(hash, index_mask)
                | entry_index as u64,
        )
    }

    /// The bits of `hash` that a slot stores as its fragment for a table with
    /// the given index mask.
    #[inline(always)]
    pub fn fragment_of(hash: u64, index_mask: usize) -> u64 {
        hash & HASH_MASK & !(index_mask as u64)
    }

    /// Returns the raw word.
    #[inline(always)]
    pub fn to_bits(self) -> u64 {
        self.0
    }

    /// Returns `true` for the empty sentinel.
    #[inline(always)]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the 1-based probe count, or 0 for an empty slot.
    #[inline(always)]
    pub fn probe_count(self) -> u32 {
        (self.0 >> PROBE_SHIFT) as u32
    }

    /// Returns the stored hash bits above the index mask.
    #[inline(always)]
    pub fn hash_fragment(self, index_mask: usize) -> u64 {
        Self::fragment_of(self.0, index_mask)
    }

    /// Returns the dense index of the slot's record.
    #[inline(always)]
    pub fn entry_index(self, index_mask: usize) -> usize {
        (self.0 & index_mask as u64) as usize
    }

    /// Returns the position the stored key hashes to, given the slot's own
    /// position.
    #[inline(always)]
    pub fn ideal_index(self, position: usize, index_mask: usize) -> usize {
        debug_assert!(!self.is_empty());
        position.wrapping_sub(self.probe_count() as usize - 1) & index_mask
    }

    /// Reconstructs the stored key's hash (truncated to the packed width)
    /// without calling the hash function.
    #[inline(always)]
    pub fn recover_hash(self, position: usize, index_mask: usize) -> u64 {
        self.hash_fragment(index_mask) | self.ideal_index(position, index_mask) as u64
    }

    /// Returns `true` when this slot holds the given probe count and the
    /// fragment of `hash`. Compares both fields in one operation.
    #[inline(always)]
    pub fn matches(self, probe: u32, hash: u64, index_mask: usize) -> bool {
        self.0 & !(index_mask as u64)
            == (u64::from(probe) << PROBE_SHIFT) | Self::fragment_of(hash, index_mask)
    }

    /// Returns a copy of this slot with a different probe count.
    ///
    /// # Panics
    ///
    /// Panics if `probe` is not in `1..=MAX_PROBE`.
    #[inline]
    pub fn with_probe(self, probe: u32) -> Self {
        assert!(
            (1..=MAX_PROBE).contains(&probe),
            "probe count {probe} does not fit the {PROBE_BITS}-bit probe field"
        );
        PackedSlot((self.0 & HASH_MASK) | (u64::from(probe) << PROBE_SHIFT))
    }

    /// Rewrites the entry index, keeping probe count and fragment.
    #[inline]
    pub(crate) fn with_entry_index(self, entry_index: usize, index_mask: usize) -> Self {
        debug_assert!(entry_index <= index_mask);
        PackedSlot((self.0 & !(index_mask as u64)) | entry_index as u64)
    }
}

impl core::fmt::Debug for PackedSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            return f.write_str("PackedSlot(empty)");
        }
        write!(
            f,
            "PackedSlot(probe={}, bits={:#018x})",
            self.probe_count(),
            self.0 & HASH_MASK
        )
    }
}
