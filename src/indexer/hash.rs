//! The hash indexer (spec §4.I): an open-addressed table of `{i, h}` slots
//! with tombstones, probing linearly and rehashing at a fixed load factor.
//!
//! The hash itself is FNV-1a with the spec's extra per-byte mix
//! (`h ^= h >> 32`), implemented as a [`core::hash::Hasher`] so it composes
//! with `#[derive(Hash)]` keys rather than requiring callers to hand it raw
//! bytes — grounded on the standard library's own `Hasher` contract, which
//! every other hash table in the ecosystem (including `nebula-memory`'s
//! `hashbrown`-backed caches) is built against.

use std::hash::{Hash, Hasher};

use super::{Indexer, Keyed, PutOutcome};

const HASH_EMPTY: u32 = 0xffff_ffff;
const HASH_DELETED: u32 = 0xffff_fffe;
const MIN_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy)]
struct Slot {
    i: u32,
    h: u32,
}

const EMPTY_SLOT: Slot = Slot { i: HASH_EMPTY, h: 0 };

/// FNV-1a over the key's bytes (as fed to it via [`Hash`]), with the spec's
/// extra mix step folded in after every byte.
struct FnvMixHasher {
    state: u64,
}

impl FnvMixHasher {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    fn new() -> Self {
        Self { state: Self::OFFSET_BASIS }
    }
}

impl Hasher for FnvMixHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= byte as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
            self.state ^= self.state >> 32;
        }
    }

    fn finish(&self) -> u64 {
        self.state
    }
}

/// Hashes `key`, folding the result into 32 bits and steering clear of both
/// sentinel values so a live slot's hash is never mistaken for empty/deleted
/// markers.
fn hash_key<K: Hash + ?Sized>(key: &K) -> u32 {
    let mut hasher = FnvMixHasher::new();
    key.hash(&mut hasher);
    let h = hasher.finish() as u32;
    match h {
        HASH_EMPTY | HASH_DELETED => h ^ 1,
        h => h,
    }
}

/// The same FNV-1a-with-mix construction over raw bytes, at full 64-bit
/// width, for [`crate::intern::NameInterner`] (spec §4.K: "same mix as the
/// hash indexer's keys").
pub(crate) fn fnv_mix_hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = FnvMixHasher::new();
    hasher.write(bytes);
    hasher.finish()
}

/// Open-addressed `{index, hash}` table over an externally-owned element
/// slice (spec §4.I). Capacity is always a power of two, starting at 16;
/// grows (doubling, at least) once occupancy — live entries plus tombstones
/// — reaches `cap/2 + cap/4`.
pub struct HashIndexer {
    slots: Vec<Slot>,
    /// Live entries plus tombstones (spec §4.I: "occupied count (including
    /// tombstones)").
    occupied: usize,
}

impl HashIndexer {
    pub fn new() -> Self {
        Self { slots: vec![EMPTY_SLOT; MIN_CAPACITY], occupied: 0 }
    }

    /// Builds a fresh, empty index and rebuilds it from every element of
    /// `elements` in order (spec §4.J: the substrate calls this when
    /// upgrading past the linear-indexer threshold).
    pub fn rebuilt_from<T: Keyed>(elements: &[T]) -> Self {
        let mut index = Self::new();
        for (i, element) in elements.iter().enumerate() {
            Indexer::set(&mut index, elements, i, element.key());
        }
        index
    }

    fn mask(&self) -> usize {
        self.slots.len() - 1
    }

    fn threshold(capacity: usize) -> usize {
        capacity / 2 + capacity / 4
    }

    fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.i != HASH_EMPTY && s.i != HASH_DELETED).count()
    }

    /// Linear probe from `h`'s home slot. Returns the slot index to act on
    /// (to insert into, if `None`, or the matching slot, if `Some`) and the
    /// matched element index, if any. Tombstones are stepped over, never
    /// matched (spec §4.I: "tombstones are skipped").
    fn probe<T: Keyed>(&self, elements: &[T], key: &T::Key, h: u32) -> (usize, Option<usize>) {
        let mask = self.mask();
        let mut idx = (h as usize) & mask;
        for _ in 0..=self.slots.len() {
            let slot = self.slots[idx];
            if slot.i == HASH_EMPTY {
                return (idx, None);
            }
            if slot.i != HASH_DELETED && slot.h == h && elements[slot.i as usize].key() == key {
                return (idx, Some(slot.i as usize));
            }
            idx = (idx + 1) & mask;
        }
        unreachable!("hash table probed a full cycle without an empty slot; load-factor invariant broken");
    }

    /// Re-inserts an already-hashed, already-unique slot during rehash.
    /// Does not touch `occupied` or compare keys: rehash only ever moves
    /// slots that were already known-distinct in the old table.
    fn reinsert(&mut self, slot: Slot) {
        let mask = self.mask();
        let mut idx = (slot.h as usize) & mask;
        loop {
            if self.slots[idx].i == HASH_EMPTY {
                self.slots[idx] = slot;
                return;
            }
            idx = (idx + 1) & mask;
        }
    }

    /// Allocates a table sized for the current live count and re-threads
    /// every non-tombstone slot into it (spec §4.I: `rehash`). Tombstones
    /// do not survive.
    fn rehash(&mut self) {
        let live = self.live_count();
        let mut new_cap = self.slots.len();
        loop {
            new_cap = (new_cap * 2).max(MIN_CAPACITY);
            if live < Self::threshold(new_cap) {
                break;
            }
        }
        let old = std::mem::replace(&mut self.slots, vec![EMPTY_SLOT; new_cap]);
        for slot in old {
            if slot.i != HASH_EMPTY && slot.i != HASH_DELETED {
                self.reinsert(slot);
            }
        }
        self.occupied = live;
    }

    fn grow_if_needed(&mut self) {
        if self.occupied >= Self::threshold(self.slots.len()) {
            self.rehash();
        }
    }
}

impl Default for HashIndexer {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed> Indexer<T> for HashIndexer {
    fn get(&self, elements: &[T], key: &T::Key) -> Option<usize> {
        let h = hash_key(key);
        self.probe(elements, key, h).1
    }

    fn put(&mut self, elements: &[T], key: &T::Key) -> PutOutcome {
        let h = hash_key(key);
        let (slot_idx, found) = self.probe(elements, key, h);
        if let Some(i) = found {
            return PutOutcome::Existing(i);
        }
        let new_index = elements.len();
        self.slots[slot_idx] = Slot { i: new_index as u32, h };
        self.occupied += 1;
        self.grow_if_needed();
        PutOutcome::New
    }

    fn del(&mut self, elements: &[T], key: &T::Key) -> Option<usize> {
        let h = hash_key(key);
        let (slot_idx, found) = self.probe(elements, key, h);
        if let Some(i) = found {
            self.slots[slot_idx] = Slot { i: HASH_DELETED, h };
            Some(i)
        } else {
            None
        }
    }

    fn set(&mut self, elements: &[T], index: usize, key: &T::Key) {
        let h = hash_key(key);
        let (slot_idx, found) = self.probe(elements, key, h);
        self.slots[slot_idx] = Slot { i: index as u32, h };
        if found.is_none() {
            self.occupied += 1;
            self.grow_if_needed();
        }
    }
}
