//! The pool allocator (spec §4.D): a fixed-size free list over blocks drawn
//! from a parent allocator, with the free-list link stored in the freed
//! slot itself.
//!
//! Grounded on `nebula-memory/src/allocator/pool.rs`'s block-of-slots
//! design, trimmed to spec.md's single-shape contract (one pool serves
//! exactly one `(size, align)`, asserted on every call).

use core::alloc::Layout;
use core::cell::{Cell, RefCell};
use core::cmp;
use core::mem;
use core::ptr::NonNull;

#[cfg(feature = "logging")]
use tracing::trace;

use super::{Allocator, DynAllocator};
use crate::config::PoolConfig;

/// Fixed-size-slot allocator. Every [`Allocator::alloc`]/[`Allocator::
/// dealloc`] call must use the exact `(size, align)` this pool was
/// constructed with (spec §4.D: "asserts the arguments match the pool's
/// size/align").
pub struct PoolAllocator {
    parent: DynAllocator,
    requested: Layout,
    slot_size: usize,
    slot_align: usize,
    block_len: usize,
    free_pattern: Option<u8>,
    free_list: Cell<*mut u8>,
    blocks: RefCell<Vec<(NonNull<u8>, Layout)>>,
}

impl PoolAllocator {
    /// Builds a pool serving slots of `requested`'s size and alignment.
    /// The slot size is bumped up to at least a pointer's size so a freed
    /// slot can hold the free-list's next-pointer (spec §4.D).
    pub fn new(parent: DynAllocator, requested: Layout, config: PoolConfig) -> Self {
        let ptr_size = mem::size_of::<*mut u8>();
        let ptr_align = mem::align_of::<*mut u8>();
        let slot_size = cmp::max(requested.size(), ptr_size);
        let slot_align = cmp::max(requested.align(), ptr_align);
        let block_len = cmp::max(1, config.block_size / slot_size);
        Self {
            parent,
            requested,
            slot_size,
            slot_align,
            block_len,
            free_pattern: config.free_pattern,
            free_list: Cell::new(core::ptr::null_mut()),
            blocks: RefCell::new(Vec::new()),
        }
    }

    /// Number of slots carved out of each new block.
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    fn assert_matches(&self, layout: Layout) {
        assert!(
            layout.size() == self.requested.size() && layout.align() == self.requested.align(),
            "pool layout mismatch: pool serves size={} align={}, got size={} align={}",
            self.requested.size(),
            self.requested.align(),
            layout.size(),
            layout.align(),
        );
    }

    /// Asks the parent for one more block and threads its slots onto the
    /// free list in reverse (so the first slot of the block is popped
    /// first, spec §4.D's `pool_grow`).
    fn grow(&self) -> bool {
        let Ok(block_layout) = Layout::from_size_align(self.slot_size * self.block_len, self.slot_align)
        else {
            return false;
        };
        let Some(block_ptr) = (unsafe { self.parent.alloc(block_layout) }) else {
            return false;
        };

        #[cfg(feature = "logging")]
        trace!(block_len = self.block_len, slot_size = self.slot_size, "pool growing by one block");

        let base = block_ptr.as_ptr();
        let mut head = self.free_list.get();
        for i in (0..self.block_len).rev() {
            // SAFETY: `i < block_len`, so this offset stays within the block.
            let slot = unsafe { base.add(i * self.slot_size) };
            // SAFETY: `slot_size >= size_of::<*mut u8>()` and `slot_align >=
            // align_of::<*mut u8>()`, so writing a pointer here is valid.
            unsafe { (slot as *mut *mut u8).write(head) };
            head = slot;
        }
        self.free_list.set(head);
        self.blocks.borrow_mut().push((block_ptr, block_layout));
        true
    }
}

unsafe impl Allocator for PoolAllocator {
    unsafe fn alloc(&self, layout: Layout) -> Option<NonNull<u8>> {
        self.assert_matches(layout);
        if self.free_list.get().is_null() && !self.grow() {
            return None;
        }
        let slot = self.free_list.get();
        // SAFETY: slots on the free list were threaded by `grow`, which
        // always writes a valid next-pointer (possibly null) at the front.
        let next = unsafe { *(slot as *mut *mut u8) };
        self.free_list.set(next);
        NonNull::new(slot)
    }

    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        self.assert_matches(layout);
        let slot = ptr.as_ptr();
        if let Some(pattern) = self.free_pattern {
            // SAFETY: `slot` is a live slot of `self.slot_size` bytes.
            unsafe { core::ptr::write_bytes(slot, pattern, self.slot_size) };
        }
        let head = self.free_list.get();
        // SAFETY: slot is valid for a pointer write; it was sized to fit one
        // at construction.
        unsafe { (slot as *mut *mut u8).write(head) };
        self.free_list.set(slot);
    }

    fn used(&self) -> usize {
        let total_slots = self.blocks.borrow().len() * self.block_len;
        let mut free = 0usize;
        let mut cur = self.free_list.get();
        while !cur.is_null() {
            free += 1;
            // SAFETY: free-list invariant: every node is a valid slot.
            cur = unsafe { *(cur as *mut *mut u8) };
        }
        (total_slots.saturating_sub(free)) * self.slot_size
    }
}

impl Drop for PoolAllocator {
    fn drop(&mut self) {
        for (ptr, layout) in self.blocks.borrow_mut().drain(..) {
            unsafe { self.parent.dealloc(ptr, layout) };
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::alloc::SystemAllocator;

    fn parent() -> DynAllocator {
        Rc::new(SystemAllocator::new())
    }

    #[test]
    fn round_trip_returns_same_pointer() {
        let pool = PoolAllocator::new(parent(), Layout::from_size_align(24, 8).unwrap(), PoolConfig::new());
        let layout = Layout::from_size_align(24, 8).unwrap();
        let p = unsafe { pool.alloc(layout) }.unwrap();
        unsafe { pool.dealloc(p, layout) };
        let q = unsafe { pool.alloc(layout) }.unwrap();
        assert_eq!(p, q);
    }

    #[test]
    fn reuse_follows_lifo_of_frees() {
        // Scenario from spec §8.2: allocate 100 slots, free them in
        // allocation order, reallocate 100 — the reallocated pointers come
        // back in the reverse (LIFO) of the freed order.
        let pool = PoolAllocator::new(parent(), Layout::from_size_align(24, 8).unwrap(), PoolConfig::new());
        let layout = Layout::from_size_align(24, 8).unwrap();

        let allocated: Vec<_> = (0..100).map(|_| unsafe { pool.alloc(layout) }.unwrap()).collect();
        for &p in &allocated {
            unsafe { pool.dealloc(p, layout) };
        }

        let reallocated: Vec<_> = (0..100).map(|_| unsafe { pool.alloc(layout) }.unwrap()).collect();
        let expected: Vec<_> = allocated.iter().rev().copied().collect();
        assert_eq!(reallocated, expected);
    }

    #[test]
    #[should_panic]
    fn mismatched_layout_asserts() {
        let pool = PoolAllocator::new(parent(), Layout::from_size_align(24, 8).unwrap(), PoolConfig::new());
        let wrong = Layout::from_size_align(8, 8).unwrap();
        unsafe { pool.alloc(wrong) };
    }
}
