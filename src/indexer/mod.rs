//! The indexer contract (spec §4.G): a pluggable strategy for locating
//! elements by key inside a contiguous buffer, swapped from linear scan to
//! an open-addressed hash table once the array substrate ([`crate::array`])
//! grows past a threshold.
//!
//! Grounded on spec.md §9's own redesign note: "replace function-pointer
//! dispatch with a sum type `{Linear, Hash(HashIndex)}` or a trait object" —
//! this crate uses a trait object (`Box<dyn Indexer<T>>`), matching
//! `nebula-memory`'s own preference for trait objects over hand-rolled
//! vtables throughout its `traits/` module.
//!
//! The spec's "keys are always a prefix of each element, compared byte for
//! byte" becomes [`Keyed`]: a typed accessor plus ordinary [`Eq`], per
//! spec.md §9's "express it with a typed `(K, V)` pair rather than
//! prefix-compare on raw bytes".

mod hash;
mod linear;

pub use hash::HashIndexer;
pub use linear::LinearIndexer;
pub(crate) use hash::fnv_mix_hash_bytes;

/// An element that carries its own key (spec §9: "key is a prefix of
/// element"). Implemented for `(K, V)` pairs (the keyed-array map shape) and
/// for [`crate::array::SetElem`] (the value-indexed/set shape, where the
/// whole element is its own key).
pub trait Keyed {
    type Key: Eq + core::hash::Hash + ?Sized;

    fn key(&self) -> &Self::Key;
}

impl<K: Eq + core::hash::Hash, V> Keyed for (K, V) {
    type Key = K;

    fn key(&self) -> &K {
        &self.0
    }
}

/// Result of [`Indexer::put`]: whether the key was already present, or this
/// is a new key the substrate must append (spec §4.I: "`put`... return
/// `length` to tell the substrate a new element was added" — resolved here
/// as an explicit variant rather than the length-sentinel convention; see
/// `DESIGN.md`'s Open Question note).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The key already maps to this element index.
    Existing(usize),
    /// The key was not present; the substrate should append the new
    /// element and then call [`Indexer::set`] (for indexers that need a
    /// second pass) or treat the insertion as already recorded.
    New,
}

/// Polymorphic keyed-lookup strategy (spec §4.G). All operations take the
/// live element slice directly rather than a `(base, stride)` pair, since
/// Rust slices already carry both.
pub trait Indexer<T: Keyed> {
    /// Locates `key` among `elements`. `None` on miss (spec §4.G: "return...
    /// the current length to signal not found" — here, idiomatically,
    /// `None`).
    fn get(&self, elements: &[T], key: &T::Key) -> Option<usize>;

    /// Locates `key`, or records that a new element is about to be appended
    /// at `elements.len()`. Does not itself mutate `elements`; the caller
    /// appends afterward.
    fn put(&mut self, elements: &[T], key: &T::Key) -> PutOutcome;

    /// Removes `key` from the index (not from `elements`) and returns its
    /// former element index, if present.
    fn del(&mut self, elements: &[T], key: &T::Key) -> Option<usize>;

    /// Records that `key` now lives at `index`, inserting or overwriting as
    /// needed (spec §4.I: `set`). Used both to rebuild an index from
    /// scratch and to patch up a single moved element after a delete-swap.
    fn set(&mut self, elements: &[T], index: usize, key: &T::Key);
}
