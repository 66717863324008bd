//! The arena allocator (spec §4.C): a growing list of blocks drawn from a
//! parent allocator, bulk-freed together.
//!
//! Grounded on `nebula-memory/src/arena/arena.rs` and `arena/mod.rs`'s
//! `ArenaConfig` (growth factor / initial size knobs), generalised here to
//! delegate to an arbitrary parent [`Allocator`] rather than always bottoming
//! out at the system allocator, per spec.md's `{base, parent, ...}` layout.

use core::alloc::Layout;
use core::cell::{Cell, RefCell};
use core::cmp;
use core::ptr::NonNull;

#[cfg(feature = "logging")]
use tracing::trace;

use super::{Allocator, DynAllocator};
use crate::config::ArenaConfig;
use crate::utils::align_up_ptr;

/// Minimum block alignment an arena will ever request from its parent,
/// regardless of what an individual allocation asks for (spec §4.C:
/// "Minimum block size and alignment are fixed constants").
pub const ARENA_MIN_BLOCK_ALIGN: usize = core::mem::align_of::<u64>();

/// Scales `size` by `factor`, saturating to `usize::MAX` instead of
/// overflowing or panicking on a degenerate factor.
fn scale_block_size(size: usize, factor: f64) -> usize {
    let scaled = (size as f64 * factor).ceil();
    if scaled.is_finite() && scaled <= usize::MAX as f64 {
        scaled as usize
    } else {
        usize::MAX
    }
}

/// Growing-block bump allocator that returns every block to its parent at
/// once via [`ArenaAllocator::free_all`].
///
/// `dealloc` on an individual allocation is always a no-op (spec §4.C:
/// "stateless with respect to individual frees").
pub struct ArenaAllocator {
    parent: DynAllocator,
    block_size: Cell<usize>,
    growth_factor: f64,
    blocks: RefCell<Vec<(NonNull<u8>, Layout)>>,
    next: Cell<*mut u8>,
    end: Cell<*mut u8>,
}

impl ArenaAllocator {
    pub fn new(parent: DynAllocator, config: ArenaConfig) -> Self {
        Self {
            parent,
            block_size: Cell::new(config.initial_block_size.max(1)),
            growth_factor: config.growth_factor,
            blocks: RefCell::new(Vec::new()),
            next: Cell::new(core::ptr::null_mut()),
            end: Cell::new(core::ptr::null_mut()),
        }
    }

    pub fn with_default_config(parent: DynAllocator) -> Self {
        Self::new(parent, ArenaConfig::default())
    }

    /// Number of blocks currently owned by this arena.
    pub fn block_count(&self) -> usize {
        self.blocks.borrow().len()
    }

    /// Tries to satisfy `layout` from the current block without growing.
    fn try_bump(&self, layout: Layout) -> Option<NonNull<u8>> {
        let next = self.next.get();
        if next.is_null() {
            return None;
        }
        let aligned = align_up_ptr(next, layout.align());
        let aligned_addr = aligned as usize;
        let end_addr = self.end.get() as usize;
        if aligned_addr > end_addr || layout.size() > end_addr - aligned_addr {
            return None;
        }
        // SAFETY: checked above that the bumped pointer stays within the
        // current block's `[next, end]`.
        let bumped = unsafe { aligned.add(layout.size()) };
        self.next.set(bumped);
        NonNull::new(aligned)
    }

    /// Grows by one block sized to fit `layout`, leaving the arena's state
    /// untouched on parent failure (spec §4.C). The very first block is
    /// sized to `block_size` as configured; every block after that scales
    /// `block_size` by `growth_factor` (spec.md's fixed 2x ramp, tunable
    /// here per [`ArenaConfig::growth_factor`]).
    fn grow(&self, layout: Layout) -> Option<NonNull<u8>> {
        let current = self.block_size.get();
        let grown = if self.blocks.borrow().is_empty() {
            current
        } else {
            scale_block_size(current, self.growth_factor)
        };
        let padded_request = layout.size().saturating_add(layout.align());
        let new_block_size = cmp::max(grown, padded_request);
        let block_align = cmp::max(ARENA_MIN_BLOCK_ALIGN, layout.align());
        let block_layout = Layout::from_size_align(new_block_size, block_align).ok()?;

        // SAFETY: `block_layout` is well-formed (checked by `from_size_align`).
        let block_ptr = unsafe { self.parent.alloc(block_layout) }?;

        let start = block_ptr.as_ptr();
        let aligned = align_up_ptr(start, layout.align());
        // SAFETY: `new_block_size >= padded_request >= layout.size() +
        // layout.align()`, so `aligned + layout.size()` stays inside the
        // block even after alignment padding.
        let end = unsafe { start.add(new_block_size) };
        let bumped = unsafe { aligned.add(layout.size()) };

        #[cfg(feature = "logging")]
        trace!(new_block_size, block_align, "arena growing by one block");

        // Commit state only now that the parent allocation succeeded, so a
        // failed growth leaves the arena exactly as it was.
        self.blocks.borrow_mut().push((block_ptr, block_layout));
        self.block_size.set(new_block_size);
        self.next.set(bumped);
        self.end.set(end);
        NonNull::new(aligned)
    }

    /// Returns every block to the parent allocator and clears the block
    /// list (spec §4.C: `arena_free`).
    pub fn free_all(&self) {
        let mut blocks = self.blocks.borrow_mut();
        for (ptr, layout) in blocks.drain(..) {
            unsafe { self.parent.dealloc(ptr, layout) };
        }
        self.next.set(core::ptr::null_mut());
        self.end.set(core::ptr::null_mut());
    }
}

unsafe impl Allocator for ArenaAllocator {
    unsafe fn alloc(&self, layout: Layout) -> Option<NonNull<u8>> {
        self.try_bump(layout).or_else(|| self.grow(layout))
    }

    /// No-op: arenas only ever free in bulk via [`Self::free_all`].
    unsafe fn dealloc(&self, _ptr: NonNull<u8>, _layout: Layout) {}

    fn used(&self) -> usize {
        self.blocks.borrow().iter().map(|(_, l)| l.size()).sum()
    }
}

impl Drop for ArenaAllocator {
    fn drop(&mut self) {
        self.free_all();
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
    fn arena_spill_doubles_block_size() {
        // Scenario from spec §8.1: min block 8 bytes, two 6-byte allocations
        // spill into a second, doubled block; a 100-byte request spills into
        // a third block sized to fit it.
        let arena = ArenaAllocator::new(
            parent(),
            ArenaConfig { initial_block_size: 8, growth_factor: 2.0 },
        );
        let small = Layout::from_size_align(6, 1).unwrap();
        unsafe { arena.alloc(small) }.unwrap();
        assert_eq!(arena.block_count(), 1);
        unsafe { arena.alloc(small) }.unwrap();
        assert_eq!(arena.block_count(), 2);

        let big = Layout::from_size_align(100, 1).unwrap();
        unsafe { arena.alloc(big) }.unwrap();
        assert_eq!(arena.block_count(), 3);
    }

    #[test]
    fn every_allocation_is_distinct_and_aligned() {
        let arena = ArenaAllocator::new(parent(), ArenaConfig::debug());
        let layout = Layout::from_size_align(24, 16).unwrap();
        let mut seen = Vec::new();
        for _ in 0..200 {
            let p = unsafe { arena.alloc(layout) }.unwrap();
            assert_eq!(p.as_ptr() as usize % 16, 0);
            seen.push(p.as_ptr() as usize);
        }
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 200);
    }

    #[test]
    fn free_all_clears_blocks() {
        let arena = ArenaAllocator::new(parent(), ArenaConfig::debug());
        let layout = Layout::from_size_align(16, 8).unwrap();
        unsafe { arena.alloc(layout) };
        unsafe { arena.alloc(layout) };
        assert!(arena.block_count() > 0);
        arena.free_all();
        assert_eq!(arena.block_count(), 0);
    }
}
