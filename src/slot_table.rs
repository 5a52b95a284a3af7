use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::slot::MAX_PROBE;
use crate::slot::PROBE_SHIFT;
use crate::slot::PackedSlot;

/// `log2` of the first real table allocated by an insertion.
pub const MIN_SHIFT: u32 = 3;

/// The entry index shares the low bits with nothing but the position, so the
/// shift is bounded by both the packed hash width and the pointer width.
const MAX_SHIFT: u32 = if usize::BITS - 1 < PROBE_SHIFT - 1 {
    usize::BITS - 1
} else {
    PROBE_SHIFT - 1
};

/// Highest number of occupied slots allowed before an insertion grows the
/// table: the free-slot fraction must stay above 1/8.
#[inline(always)]
fn max_occupied(capacity: usize) -> usize {
    capacity - (capacity >> 3)
}

/// Debug statistics for slot table analysis.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of occupied slots
    pub populated: usize,
    /// Total number of slots allocated
    pub capacity: usize,
    /// Occupied slots allowed before the next growth
    pub max_populated: usize,
    /// Load factor (populated / capacity)
    pub load_factor: f64,
    /// Longest probe sequence currently stored
    pub max_probe: u32,
    /// Mean probe count over occupied slots
    pub mean_probe: f64,
    /// Bytes used by the slot array
    pub slot_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Slot Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor, grows at {})",
            self.populated,
            self.capacity,
            self.load_factor * 100.0,
            self.max_populated
        );
        println!(
            "Probes: max {} / {}, mean {:.3}",
            self.max_probe, MAX_PROBE, self.mean_probe
        );
        println!("Slot Array: {} bytes", self.slot_bytes);
    }
}

/// One occupied slot, unpacked for inspection.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInfo {
    /// Position of the slot in the table.
    pub position: usize,
    /// 1-based distance from the ideal position.
    pub probe_count: u32,
    /// Stored hash bits above the index mask.
    pub hash_fragment: u64,
    /// Dense index into the entry store.
    pub entry_index: usize,
    /// Position the key hashes to, recovered from `position` and `probe_count`.
    pub ideal_index: usize,
}

/// Outcome of walking a probe sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lookup {
    /// The key is stored at `position` and its record lives at `entry_index`.
    Found { position: usize, entry_index: usize },
    /// The key is absent; this is where it would be inserted.
    Vacant(VacantSlot),
}

/// The insertion point of an absent key: the first slot whose resident is
/// richer (smaller probe count) than the key would be there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VacantSlot {
    position: usize,
    probe: u32,
}

/// A power-of-two circular array of [`PackedSlot`] words.
///
/// The table only stores metadata: which hash lives where, how far it is from
/// its ideal position, and the dense index of its record in the entry store.
/// Key equality is decided by the caller through a closure over entry indices.
///
/// A default table is a single-slot placeholder (`shift == 0`). It is always
/// empty, so lookups on it terminate on the first slot without a separate
/// emptiness check. The first insertion replaces it with a table of
/// `2^MIN_SHIFT` slots.
#[derive(Clone)]
pub struct SlotTable {
    slots: Box<[PackedSlot]>,
    shift: u32,
    occupied: usize,
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for SlotTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::string::String;

        if self.is_placeholder() {
            return f
                .debug_struct("SlotTable")
                .field("slots", &"placeholder")
                .field("occupied", &self.occupied)
                .finish();
        }

        let mask = self.index_mask();
        f.debug_struct("SlotTable")
            .field("shift", &self.shift)
            .field("occupied", &self.occupied)
            .field(
                "slots",
                &self
                    .slots
                    .chunks(8)
                    .map(|row| {
                        row.iter()
                            .map(|slot| {
                                if slot.is_empty() {
                                    String::from("..")
                                } else {
                                    format!(
                                        "{:02}/{:x}@{}",
                                        slot.probe_count(),
                                        slot.hash_fragment(mask) >> self.shift,
                                        slot.entry_index(mask)
                                    )
                                }
                            })
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl SlotTable {
    /// Creates the single-slot placeholder table.
    pub fn new() -> Self {
        Self::with_shift(0)
    }

    /// Creates a table with at least `capacity` slots, rounded up to a power
    /// of two and to the minimum table size. A capacity of zero creates the
    /// placeholder.
    ///
    /// # Panics
    ///
    /// Panics if the rounded capacity cannot be addressed by the packed entry
    /// index.
    pub fn with_capacity(capacity: usize) -> Self {
        if capacity == 0 {
            return Self::new();
        }
        let shift = capacity
            .checked_next_power_of_two()
            .expect("capacity overflow")
            .trailing_zeros()
            .max(MIN_SHIFT);
        assert!(shift <= MAX_SHIFT, "capacity overflow");
        Self::with_shift(shift)
    }

    fn with_shift(shift: u32) -> Self {
        Self {
            slots: vec![PackedSlot::EMPTY; 1 << shift].into_boxed_slice(),
            shift,
            occupied: 0,
        }
    }

    /// Number of slots, or zero for the placeholder.
    #[inline]
    pub fn capacity(&self) -> usize {
        if self.is_placeholder() {
            0
        } else {
            self.slots.len()
        }
    }

    /// `log2` of the slot count.
    #[inline]
    pub fn shift(&self) -> u32 {
        self.shift
    }

    /// Mask selecting a position from a hash. Also the widest entry index the
    /// table can store.
    #[inline(always)]
    pub fn index_mask(&self) -> usize {
        self.slots.len() - 1
    }

    /// Number of occupied slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.occupied
    }

    /// Returns `true` if no slot is occupied.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Returns `true` for the single-slot table of a map that never stored
    /// anything.
    #[inline]
    pub fn is_placeholder(&self) -> bool {
        self.shift == 0
    }

    /// Returns `true` when the next insertion must grow the table first.
    #[inline]
    pub(crate) fn needs_growth(&self) -> bool {
        self.is_placeholder() || self.occupied >= max_occupied(self.slots.len())
    }

    /// Walks the probe sequence of `hash`.
    ///
    /// `eq` is called with the entry index of every slot whose probe count and
    /// hash fragment match, and decides whether that record holds the key.
    #[inline]
    pub(crate) fn lookup(&self, hash: u64, mut eq: impl FnMut(usize) -> bool) -> Lookup {
        let mask = self.index_mask();
        let mut position = hash as usize & mask;
        let mut probe = 1;

        loop {
            let slot = self.slots[position];
            // Residents are ordered by ideal position, so once a resident is
            // closer to home than we would be, the key cannot appear later.
            if slot.probe_count() < probe {
                return Lookup::Vacant(VacantSlot { position, probe });
            }
            if slot.matches(probe, hash, mask) {
                let entry_index = slot.entry_index(mask);
                if eq(entry_index) {
                    return Lookup::Found {
                        position,
                        entry_index,
                    };
                }
            }

            position = (position + 1) & mask;
            probe += 1;
        }
    }

    /// Returns the `(position, entry_index)` of the slot accepted by `eq`.
    #[inline]
    pub(crate) fn find(&self, hash: u64, eq: impl FnMut(usize) -> bool) -> Option<(usize, usize)> {
        match self.lookup(hash, eq) {
            Lookup::Found {
                position,
                entry_index,
            } => Some((position, entry_index)),
            Lookup::Vacant(_) => None,
        }
    }

    /// Returns the insertion point for a hash whose key is known to be absent.
    pub(crate) fn vacant_for(&self, hash: u64) -> VacantSlot {
        match self.lookup(hash, |_| false) {
            Lookup::Vacant(vacant) => vacant,
            Lookup::Found { .. } => unreachable!("lookup matched without an equal key"),
        }
    }

    /// Counts the stored words whose packed hash equals that of `hash`.
    ///
    /// Such words share an ideal position and fragment at every capacity, so
    /// no amount of growth separates them.
    pub(crate) fn count_identical(&self, hash: u64) -> usize {
        let mut count = 0;
        let _ = self.lookup(hash, |_| {
            count += 1;
            false
        });
        count
    }

    /// Returns `true` when inserting at `vacant` keeps every probe count,
    /// including those of the displaced residents, within [`MAX_PROBE`].
    pub(crate) fn can_insert(&self, vacant: VacantSlot) -> bool {
        let mask = self.index_mask();
        let mut position = vacant.position;
        let mut carried = vacant.probe;

        loop {
            if carried > MAX_PROBE {
                return false;
            }
            let resident = self.slots[position];
            if resident.is_empty() {
                return true;
            }
            if resident.probe_count() < carried {
                carried = resident.probe_count();
            }
            position = (position + 1) & mask;
            carried += 1;
        }
    }

    /// Stores `hash` with `entry_index` at `vacant`, stealing slots from
    /// richer residents until an empty slot absorbs the last displaced word.
    ///
    /// Equal probe counts never evict each other.
    ///
    /// # Panics
    ///
    /// Panics if a probe count would exceed [`MAX_PROBE`]; callers check
    /// [`can_insert`](Self::can_insert) first.
    pub(crate) fn insert_at(&mut self, vacant: VacantSlot, hash: u64, entry_index: usize) {
        debug_assert!(!self.is_placeholder());
        debug_assert!(self.occupied < self.slots.len());

        let mask = self.index_mask();
        let mut carried = PackedSlot::pack(vacant.probe, hash, entry_index, mask);
        let mut position = vacant.position;

        loop {
            let resident = self.slots[position];
            if resident.is_empty() {
                self.slots[position] = carried;
                break;
            }
            if resident.probe_count() < carried.probe_count() {
                self.slots[position] = carried;
                carried = resident;
            }
            position = (position + 1) & mask;
            carried = carried.with_probe(carried.probe_count() + 1);
        }

        self.occupied += 1;
    }

    /// Empties the slot at `position` and shifts the rest of its cluster back
    /// by one. Returns the entry index the slot held.
    pub(crate) fn remove_at(&mut self, mut position: usize) -> usize {
        let mask = self.index_mask();
        let removed = self.slots[position];
        debug_assert!(!removed.is_empty());

        self.slots[position] = PackedSlot::EMPTY;
        self.occupied -= 1;

        loop {
            let next = (position + 1) & mask;
            let slot = self.slots[next];
            // Empty, or already at its ideal position.
            if slot.probe_count() <= 1 {
                break;
            }
            self.slots[position] = slot.with_probe(slot.probe_count() - 1);
            self.slots[next] = PackedSlot::EMPTY;
            position = next;
        }

        removed.entry_index(mask)
    }

    /// Doubles the table, or replaces the placeholder with the minimum table.
    ///
    /// Keys are never rehashed: each word's hash is recovered from its
    /// position and fragment, and the new ideal position is the old one plus
    /// the next hash bit, which the fragment still holds.
    ///
    /// # Panics
    ///
    /// Panics if the doubled table could not be addressed by the packed entry
    /// index.
    #[cold]
    pub(crate) fn grow(&mut self) {
        if self.is_placeholder() {
            *self = Self::with_shift(MIN_SHIFT);
            return;
        }

        let new_shift = self.shift + 1;
        assert!(new_shift <= MAX_SHIFT, "capacity overflow");

        let old_mask = self.index_mask();
        let mut grown = Self::with_shift(new_shift);

        // Start at the head of a cluster so that entries which wrapped past
        // the end of the table are visited after the entries preceding them.
        let start = self
            .slots
            .iter()
            .position(|slot| slot.probe_count() <= 1)
            .unwrap_or(0);

        for offset in 0..self.slots.len() {
            let position = (start + offset) & old_mask;
            let slot = self.slots[position];
            if slot.is_empty() {
                continue;
            }
            let hash = slot.recover_hash(position, old_mask);
            grown.place_in_order(hash, slot.entry_index(old_mask));
        }

        debug_assert_eq!(grown.occupied, self.occupied);
        *self = grown;
    }

    /// Places a word at the first empty slot from its ideal position.
    ///
    /// Only valid while words arrive in cluster order, which is what
    /// [`grow`](Self::grow) guarantees: every earlier word already sits at or
    /// before the position a Robin Hood insertion would have given it.
    fn place_in_order(&mut self, hash: u64, entry_index: usize) {
        let mask = self.index_mask();
        let mut position = hash as usize & mask;
        let mut probe = 1;
        while !self.slots[position].is_empty() {
            position = (position + 1) & mask;
            probe += 1;
        }
        self.slots[position] = PackedSlot::pack(probe, hash, entry_index, mask);
        self.occupied += 1;
    }

    /// Grows until `entries` fit without another growth.
    ///
    /// Reserving nothing leaves the placeholder in place.
    pub(crate) fn reserve(&mut self, entries: usize) {
        if entries == 0 {
            return;
        }
        while self.is_placeholder() || entries > max_occupied(self.slots.len()) {
            self.grow();
        }
    }

    /// Rewrites every entry index through `remap` after the entry store was
    /// compacted.
    pub(crate) fn remap_entries(&mut self, remap: &[usize]) {
        let mask = self.index_mask();
        for slot in self.slots.iter_mut().filter(|slot| !slot.is_empty()) {
            let entry_index = remap[slot.entry_index(mask)];
            debug_assert_ne!(entry_index, crate::entry_store::REMOVED);
            *slot = slot.with_entry_index(entry_index, mask);
        }
    }

    /// Empties every slot, keeping the allocation.
    pub(crate) fn clear(&mut self) {
        self.slots.fill(PackedSlot::EMPTY);
        self.occupied = 0;
    }

    /// The raw slot words, including empty ones.
    #[cfg(any(test, feature = "stats"))]
    pub fn raw_slots(&self) -> &[PackedSlot] {
        &self.slots
    }

    /// Unpacks every occupied slot, in position order.
    #[cfg(any(test, feature = "stats"))]
    pub fn slots(&self) -> impl Iterator<Item = SlotInfo> + '_ {
        let mask = self.index_mask();
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.is_empty())
            .map(move |(position, slot)| SlotInfo {
                position,
                probe_count: slot.probe_count(),
                hash_fragment: slot.hash_fragment(mask),
                entry_index: slot.entry_index(mask),
                ideal_index: slot.ideal_index(position, mask),
            })
    }

    /// Computes a histogram of probe counts.
    ///
    /// Returns a vector of length `MAX_PROBE + 1` where index `n` counts the
    /// occupied slots with probe count `n`. Index 0 is always zero.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> Vec<usize> {
        let mut hist = vec![0usize; MAX_PROBE as usize + 1];
        for slot in self.slots.iter().filter(|slot| !slot.is_empty()) {
            hist[slot.probe_count() as usize] += 1;
        }
        hist
    }

    /// Returns utilization and probe statistics.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let capacity = self.capacity();
        let hist = self.probe_histogram();
        let total_probes: usize = hist.iter().enumerate().map(|(p, n)| p * n).sum();

        DebugStats {
            populated: self.occupied,
            capacity,
            max_populated: if capacity == 0 {
                0
            } else {
                max_occupied(capacity)
            },
            load_factor: if capacity == 0 {
                0.0
            } else {
                self.occupied as f64 / capacity as f64
            },
            max_probe: hist.iter().rposition(|&n| n != 0).unwrap_or(0) as u32,
            mean_probe: if self.occupied == 0 {
                0.0
            } else {
                total_probes as f64 / self.occupied as f64
            },
            slot_bytes: core::mem::size_of_val(&*self.slots),
        }
    }

    /// Pretty-prints the probe-count histogram horizontally using stdout.
    #[cfg(all(any(test, feature = "stats"), feature = "std"))]
    pub fn print_probe_histogram(&self) {
        let hist = self.probe_histogram();
        let max = hist.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        println!("probe histogram ({} slots occupied):", self.occupied);
        let last = hist.iter().rposition(|&n| n != 0).unwrap_or(0);
        for (probe, &count) in hist.iter().enumerate().take(last + 1).skip(1) {
            let width = (count * max_bar).div_ceil(max);
            println!("{:>2} | {} ({})", probe, "█".repeat(width), count);
        }
    }
}
