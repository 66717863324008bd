//! The array substrate (spec §4.J): a growable buffer that doubles as a
//! sequence and, with an attached [`Indexer`], a keyed map or set.
//!
//! Spec.md's layout is a single allocation of `[default slot | header |
//! elements]` with the client handle pointing at element 0, recovered by
//! pointer arithmetic (spec §3, §9). Spec.md §9 itself flags that trick as
//! non-portable and names the replacement used here: "a value-type wrapper
//! containing an owning allocation and exposing indexing" — so [`RawArray`]
//! just holds its header fields (`len`, `cap`, `allocator`) directly,
//! grounded on the same growth-then-relocate shape as
//! `nebula-memory/src/arena/arena.rs`'s block list, generalised to element
//! granularity instead of block granularity.
//!
//! The "default slot returned on keyed-lookup miss" becomes an ordinary
//! `V: Default` value rather than a stable zeroed address — the stability
//! the spec cares about (miss handling must never be `null`/a special case
//! the caller has to branch on) carries over; the specific address-equality
//! of repeated misses does not, since nothing in spec.md's testable
//! properties (§8) depends on it. See `DESIGN.md`'s Open Question entry.

use std::fmt;
use std::ops::Range;
use std::ptr::NonNull;

use crate::alloc::{free, Allocator, DynAllocator};
use crate::indexer::{HashIndexer, Indexer, Keyed, LinearIndexer, PutOutcome};

/// Growable buffer over `T`, backed by a [`DynAllocator`] rather than the
/// global allocator, so it can live inside an arena or a pool like any other
/// allocation (spec §4.J: "owning allocation").
pub struct RawArray<T> {
    allocator: DynAllocator,
    ptr: NonNull<T>,
    len: usize,
    cap: usize,
}

fn layout_for<T>(cap: usize) -> Option<std::alloc::Layout> {
    std::alloc::Layout::array::<T>(cap).ok()
}

impl<T> RawArray<T> {
    pub fn new(allocator: DynAllocator) -> Self {
        Self { allocator, ptr: NonNull::dangling(), len: 0, cap: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `[ptr, ptr+len)` is always initialised (spec §8: "header
        // recoverability" — `len <= cap` always holds).
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Resizes the backing allocation, applying a 1.5x growth floor when
    /// growing (spec §4.J: `setcap`, "apply a 1.5x growth floor so that
    /// geometric growth amortises"). Leaves the array untouched on
    /// allocation failure (spec §7).
    pub fn setcap(&mut self, requested_cap: usize) -> bool {
        if requested_cap == self.cap {
            return true;
        }
        let new_cap = if requested_cap > self.cap {
            requested_cap.max(self.cap + self.cap / 2)
        } else {
            requested_cap
        };

        if new_cap == 0 {
            for i in 0..self.len {
                unsafe { std::ptr::drop_in_place(self.ptr.as_ptr().add(i)) };
            }
            if self.cap > 0 {
                let old_layout = layout_for::<T>(self.cap).expect("old capacity was already valid");
                unsafe { free(self.allocator.as_ref(), Some(self.ptr.cast()), old_layout) };
            }
            self.ptr = NonNull::dangling();
            self.cap = 0;
            self.len = 0;
            return true;
        }

        let Some(new_layout) = layout_for::<T>(new_cap) else {
            return false;
        };
        let Some(raw) = (unsafe { self.allocator.alloc(new_layout) }) else {
            return false;
        };
        let new_ptr = raw.cast::<T>();

        let to_move = self.len.min(new_cap);
        if to_move > 0 {
            // SAFETY: `to_move <= self.len` (source is valid) and `to_move
            // <= new_cap` (destination has room). The two allocations never
            // overlap.
            unsafe { std::ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), to_move) };
        }
        // Elements beyond `new_cap` would be truncated: drop them so we
        // don't leak (only possible when shrinking past `len`).
        if self.len > new_cap {
            for i in new_cap..self.len {
                unsafe { std::ptr::drop_in_place(self.ptr.as_ptr().add(i)) };
            }
        }
        if self.cap > 0 {
            let old_layout = layout_for::<T>(self.cap).expect("old capacity was already valid");
            unsafe { self.allocator.dealloc(self.ptr.cast(), old_layout) };
        }

        self.ptr = new_ptr;
        self.cap = new_cap;
        self.len = self.len.min(new_cap);
        true
    }

    /// Grows to at least `min_cap` if not already there (spec §4.J: `fit`).
    pub fn fit(&mut self, min_cap: usize) -> bool {
        if min_cap > self.cap {
            self.setcap(min_cap)
        } else {
            true
        }
    }

    /// Appends `value`, growing geometrically if needed (spec §4.J: `push`).
    /// `None` on allocation failure, with the array left untouched.
    pub fn push(&mut self, value: T) -> Option<usize> {
        if !self.fit(self.len + 1) {
            return None;
        }
        // SAFETY: `fit` just ensured `len + 1 <= cap`.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
        Some(self.len - 1)
    }

    /// Removes and returns the last element, if any (spec §4.J: `pop`).
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: index `len` (pre-decrement) was a live, initialised slot.
        Some(unsafe { self.ptr.as_ptr().add(self.len).read() })
    }

    /// Fills the next `n` slots with clones of `value` (spec §4.J: `fill`).
    pub fn fill(&mut self, value: T, n: usize) -> bool
    where
        T: Clone,
    {
        if n == 0 {
            return true;
        }
        if !self.fit(self.len + n) {
            return false;
        }
        // SAFETY: `fit` ensured room for `n` more elements starting at `len`.
        unsafe {
            let base = self.ptr.as_ptr().add(self.len);
            for k in 0..n {
                base.add(k).write(value.clone());
            }
        }
        self.len += n;
        true
    }

    /// Removes up to `n` elements starting at `i`, shifting the tail down
    /// (spec §4.J: `deln`, "clamp `n` to `len - i`").
    pub fn deln(&mut self, i: usize, n: usize) {
        if i >= self.len {
            return;
        }
        let n = n.min(self.len - i);
        if n == 0 {
            return;
        }
        // SAFETY: `i + n <= len`, so every pointer below stays in bounds.
        unsafe {
            let base = self.ptr.as_ptr();
            for j in 0..n {
                std::ptr::drop_in_place(base.add(i + j));
            }
            let tail_len = self.len - (i + n);
            if tail_len > 0 {
                std::ptr::copy(base.add(i + n), base.add(i), tail_len);
            }
        }
        self.len -= n;
    }

    /// Removes the element at `i`, moving the last element into its place
    /// (spec §4.J's keyed `del`'s "delete-swap" shape, lifted to the
    /// sequence layer since it's exactly `Vec::swap_remove`'s contract).
    ///
    /// # Panics
    /// Panics if `i >= len()`.
    pub fn swap_remove(&mut self, i: usize) -> T {
        assert!(i < self.len, "swap_remove index out of bounds");
        let last = self.len - 1;
        // SAFETY: both `i` and `last` are within `[0, len)`.
        unsafe {
            let removed = self.ptr.as_ptr().add(i).read();
            if i != last {
                let moved = self.ptr.as_ptr().add(last).read();
                self.ptr.as_ptr().add(i).write(moved);
            }
            self.len = last;
            removed
        }
    }

    /// Appends clones of `self[range]` to the end of `self` — the
    /// aliasing-safe shape of spec §4.J's `catn` (spec §8: "Aliasing
    /// safety... even when growth relocated the buffer"). Because this
    /// indexes into `self` *after* any growth rather than holding a raw
    /// pointer captured beforehand, there is no stale-source-pointer hazard
    /// to patch up the way the spec's C original has to.
    pub fn catn_within(&mut self, range: Range<usize>) -> bool
    where
        T: Clone,
    {
        assert!(range.end <= self.len, "catn_within range out of bounds");
        let srclen = range.end.saturating_sub(range.start);
        if srclen == 0 {
            return true;
        }
        if !self.fit(self.len + srclen) {
            return false;
        }
        for i in range {
            // SAFETY: `i < len <= cap`, and `fit` above reserved room at the
            // tail; reading and writing through the (possibly just-grown)
            // `self.ptr` rather than a pointer captured before `fit` is what
            // makes this safe under relocation.
            let value = unsafe { (*self.ptr.as_ptr().add(i)).clone() };
            unsafe { self.ptr.as_ptr().add(self.len).write(value) };
            self.len += 1;
        }
        true
    }

    /// Appends a foreign slice that is known not to alias `self`'s buffer
    /// (spec §4.J's `catn` for the non-self-referential case).
    pub fn extend_from_slice(&mut self, src: &[T]) -> bool
    where
        T: Clone,
    {
        if !self.fit(self.len + src.len()) {
            return false;
        }
        for (k, value) in src.iter().enumerate() {
            unsafe { self.ptr.as_ptr().add(self.len + k).write(value.clone()) };
        }
        self.len += src.len();
        true
    }
}

impl RawArray<u8> {
    /// Formats `args` into the tail of the buffer, growing as needed (spec
    /// §4.J: `aprintf`). Spec.md §9 calls out the two-pass `vsnprintf`
    /// trick as replaceable by "a format builder whose native interface is
    /// 'how many bytes would you write'"; `fmt::Write` already gives that,
    /// so this grows on demand in one pass instead of probing then retrying.
    pub fn aprintf(&mut self, args: fmt::Arguments<'_>) -> usize {
        struct Writer<'a> {
            array: &'a mut RawArray<u8>,
        }
        impl fmt::Write for Writer<'_> {
            fn write_str(&mut self, s: &str) -> fmt::Result {
                if self.array.extend_from_slice(s.as_bytes()) {
                    Ok(())
                } else {
                    Err(fmt::Error)
                }
            }
        }
        let before = self.len;
        let mut writer = Writer { array: self };
        fmt::write(&mut writer, args).expect("formatting into a growable buffer should not fail");
        self.len - before
    }
}

impl<T> Drop for RawArray<T> {
    fn drop(&mut self) {
        for i in 0..self.len {
            unsafe { std::ptr::drop_in_place(self.ptr.as_ptr().add(i)) };
        }
        if self.cap > 0 {
            if let Some(layout) = layout_for::<T>(self.cap) {
                unsafe { self.allocator.dealloc(self.ptr.cast(), layout) };
            }
        }
    }
}

/// Wraps a value so the whole element is its own key (spec §4.J:
/// "value-indexed variants... the substrate treats the whole element as the
/// key"), giving a set built on the same [`KeyedArray`] machinery as a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SetElem<T>(pub T);

impl<T: Eq + std::hash::Hash> Keyed for SetElem<T> {
    type Key = T;

    fn key(&self) -> &T {
        &self.0
    }
}

/// The keyed view of the array substrate (spec §4.J's keyed operations):
/// a [`RawArray`] plus an [`Indexer`] that starts out linear and
/// auto-upgrades to a hash index once the element count crosses
/// [`KeyedArray::UPGRADE_THRESHOLD`] (spec §4.J: "if `len >= 32` and `index`
/// is still the linear default").
pub struct KeyedArray<T: Keyed> {
    elements: RawArray<T>,
    index: Box<dyn Indexer<T>>,
    is_default_linear: bool,
}

impl<T: Keyed> KeyedArray<T> {
    /// Element count past which a linear index is replaced by a hash index.
    pub const UPGRADE_THRESHOLD: usize = 32;

    pub fn new(allocator: DynAllocator) -> Self {
        Self { elements: RawArray::new(allocator), index: Box::new(LinearIndexer), is_default_linear: true }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        self.elements.as_slice()
    }

    pub fn get(&self, i: usize) -> Option<&T> {
        self.elements.as_slice().get(i)
    }

    /// Locates `key`'s element index (spec §4.J: `geti`).
    pub fn geti(&self, key: &T::Key) -> Option<usize> {
        self.index.get(self.elements.as_slice(), key)
    }

    fn upgrade_to_hash(&mut self) {
        let rebuilt = HashIndexer::rebuilt_from(self.elements.as_slice());
        self.index = Box::new(rebuilt);
        self.is_default_linear = false;
    }

    /// Inserts `value`, or overwrites the existing element with the same
    /// key in place (spec §4.J: `put`). Auto-upgrades the index first if
    /// this insertion would cross the threshold while still linear.
    /// `None` on allocation failure, with the array left untouched.
    pub fn put(&mut self, value: T) -> Option<usize> {
        if self.is_default_linear && self.len() + 1 >= Self::UPGRADE_THRESHOLD {
            self.upgrade_to_hash();
        }
        // Reserve first so a later allocation failure can't leave the index
        // pointing at a slot `push` never actually wrote.
        if !self.elements.fit(self.len() + 1) {
            return None;
        }
        match self.index.put(self.elements.as_slice(), value.key()) {
            PutOutcome::Existing(i) => {
                self.elements.as_mut_slice()[i] = value;
                Some(i)
            }
            PutOutcome::New => self.elements.push(value),
        }
    }

    /// Removes `key`'s element, swapping the last element into its place
    /// and patching the index accordingly (spec §4.J: `del`,
    /// "delete-swap").
    pub fn del(&mut self, key: &T::Key) -> Option<T> {
        let i = self.index.del(self.elements.as_slice(), key)?;
        let last = self.len() - 1;
        if i != last {
            let slice = self.elements.as_slice();
            let moved_key = slice[last].key();
            self.index.set(slice, i, moved_key);
        }
        Some(self.elements.swap_remove(i))
    }

    /// Replaces the attached index wholesale, rebuilding it from every
    /// existing element (spec §4.J: `setindex`).
    pub fn set_index(&mut self, mut new_index: Box<dyn Indexer<T>>) {
        for (i, element) in self.elements.as_slice().iter().enumerate() {
            new_index.set(self.elements.as_slice(), i, element.key());
        }
        self.index = new_index;
        self.is_default_linear = false;
    }
}

/// Value-tail accessors, meaningful only for the `(K, V)` map shape (spec
/// §4.J: `getp`/`get` return "a pointer to the value tail of that element").
impl<K: Eq + std::hash::Hash, V> KeyedArray<(K, V)> {
    /// Pointer to the value half of `key`'s element, or `None` on miss
    /// (spec §4.J: `getp`).
    pub fn getp(&self, key: &K) -> Option<&V> {
        let i = self.geti(key)?;
        Some(&self.elements.as_slice()[i].1)
    }

    /// Infallible read: `key`'s value, or `V::default()` on miss (spec
    /// §4.J: `get`, the "default slot" reinterpreted per this module's
    /// doc comment).
    pub fn get_or_default(&self, key: &K) -> V
    where
        V: Clone + Default,
    {
        self.getp(key).cloned().unwrap_or_default()
    }
}
