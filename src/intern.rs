//! The name interner (spec §4.K): canonicalises byte strings so that equal
//! strings share one stable address, for the lifetime of the map.
//!
//! Grounded on `nebula-expression/src/core/interner.rs`'s `StringInterner`
//! for the overall shape (hash lookup, allocate-on-miss, stable returned
//! references), generalised here to spec.md's two-array design: a primary
//! slot per hash plus an explicit collision list, both built from the array
//! substrate ([`crate::array`]) and backed by this map's own arena — a
//! client of components C (arena), J (array substrate) and I (hashing), as
//! spec §2's control-flow diagram names it.

use std::ptr::NonNull;
use std::rc::Rc;

use crate::alloc::{Allocator, ArenaAllocator, DynAllocator};
use crate::array::{KeyedArray, RawArray};
use crate::config::ArenaConfig;
use crate::indexer::fnv_mix_hash_bytes;

/// A canonicalised byte string. Cheap to copy (it's just a pointer and a
/// length into the interner's arena); valid for as long as the
/// [`NameInterner`] that produced it is alive.
#[derive(Clone, Copy)]
pub struct InternedName {
    ptr: NonNull<u8>,
    len: usize,
}

impl InternedName {
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: the arena that allocated this node outlives every
        // `InternedName` handed out from it (spec §4.K: "valid until the
        // map is freed").
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()).ok()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl PartialEq for InternedName {
    fn eq(&self, other: &Self) -> bool {
        // Identity is address equality once interned (spec §8: "Intern
        // identity: intern(x) == intern(y) iff bytes(x) == bytes(y)" — since
        // two equal byte strings always resolve to the same node, pointer
        // equality and byte equality coincide here).
        self.ptr == other.ptr && self.len == other.len
    }
}

impl Eq for InternedName {}

impl std::fmt::Debug for InternedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "InternedName({s:?})"),
            None => write!(f, "InternedName({:?})", self.as_bytes()),
        }
    }
}

/// Hash-of-bytes keyed table of arena-allocated immutable byte strings
/// (spec §4.K). Owns an arena for the strings themselves, plus two
/// bookkeeping arrays: a primary slot per hash, and an overflow collision
/// list for the (rare) case of two different byte strings sharing a hash.
pub struct NameInterner {
    arena: Rc<ArenaAllocator>,
    primary: KeyedArray<(u64, InternedName)>,
    collisions: RawArray<InternedName>,
}

impl NameInterner {
    /// `bookkeeping` backs the two lookup arrays; `arena_parent` is the
    /// allocator the interner's own arena draws its blocks from. These are
    /// deliberately allowed to differ (spec §4.E's trace allocator note
    /// about avoiding recursion generalises here too: a caller may want the
    /// interned bytes on a dedicated arena while bookkeeping stays on the
    /// system allocator).
    pub fn new(bookkeeping: DynAllocator, arena_parent: DynAllocator, arena_config: ArenaConfig) -> Self {
        Self {
            arena: Rc::new(ArenaAllocator::new(arena_parent, arena_config)),
            primary: KeyedArray::new(Rc::clone(&bookkeeping)),
            collisions: RawArray::new(bookkeeping),
        }
    }

    pub fn with_default_config(bookkeeping: DynAllocator, arena_parent: DynAllocator) -> Self {
        Self::new(bookkeeping, arena_parent, ArenaConfig::default())
    }

    /// Canonicalises `bytes`, returning the same [`InternedName`] for any
    /// byte-equal input (spec §4.K: `intern`). `None` only if the arena
    /// cannot satisfy a genuinely new string's allocation.
    pub fn intern(&mut self, bytes: &[u8]) -> Option<InternedName> {
        let hash = fnv_mix_hash_bytes(bytes);

        if let Some(i) = self.primary.geti(&hash) {
            let existing = self.primary.as_slice()[i].1;
            if existing.as_bytes() == bytes {
                return Some(existing);
            }
            for node in self.collisions.as_slice() {
                if node.as_bytes() == bytes {
                    return Some(*node);
                }
            }
            let node = self.allocate_node(bytes)?;
            self.collisions.push(node)?;
            Some(node)
        } else {
            let node = self.allocate_node(bytes)?;
            self.primary.put((hash, node))?;
            Some(node)
        }
    }

    /// Convenience wrapper for UTF-8 input.
    pub fn intern_str(&mut self, s: &str) -> Option<InternedName> {
        self.intern(s.as_bytes())
    }

    /// Number of distinct strings interned so far.
    pub fn len(&self) -> usize {
        self.primary.len() + self.collisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn allocate_node(&self, bytes: &[u8]) -> Option<InternedName> {
        let layout = std::alloc::Layout::from_size_align(bytes.len() + 1, 1).ok()?;
        // SAFETY: `layout` is well-formed; the returned pointer is used only
        // for exactly `layout.size()` bytes below.
        let ptr = unsafe { self.arena.alloc(layout) }?;
        // SAFETY: `ptr` is valid for `bytes.len() + 1` bytes and not aliased.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len());
            *ptr.as_ptr().add(bytes.len()) = 0;
        }
        Some(InternedName { ptr, len: bytes.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::SystemAllocator;

    fn interner() -> NameInterner {
        let sys: DynAllocator = Rc::new(SystemAllocator::new());
        NameInterner::with_default_config(Rc::clone(&sys), sys)
    }

    #[test]
    fn identical_bytes_intern_to_the_same_address() {
        let mut names = interner();
        let a = names.intern_str("hello").unwrap();
        let b = names.intern_str("hello").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_bytes().as_ptr(), b.as_bytes().as_ptr());
    }

    #[test]
    fn different_bytes_intern_to_different_addresses() {
        let mut names = interner();
        let a = names.intern_str("hello").unwrap();
        let b = names.intern_str("world").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn strings_remain_readable_after_many_more_are_interned() {
        let mut names = interner();
        let first = names.intern_str("the-first-one").unwrap();
        for i in 0..500 {
            names.intern_str(&format!("filler-{i}")).unwrap();
        }
        assert_eq!(first.as_str(), Some("the-first-one"));
        assert_eq!(names.intern_str("the-first-one").unwrap(), first);
    }

    #[test]
    fn trailing_byte_is_nul() {
        let mut names = interner();
        let name = names.intern_str("x").unwrap();
        // SAFETY: `allocate_node` always reserves `len + 1` bytes and writes
        // a NUL at the end, for parity with spec.md's "trailing NUL
        // guaranteed" node layout.
        let past_end = unsafe { *name.as_bytes().as_ptr().add(name.len()) };
        assert_eq!(past_end, 0);
    }
}
