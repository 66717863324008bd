//! The allocator family (spec §4.A–E): a uniform polymorphic allocator
//! contract plus four concrete implementations that compose by holding a
//! parent allocator, never by header-punning.
//!
//! Grounded on `nebula-memory/src/allocator/{mod.rs,traits.rs,bump.rs,
//! system.rs}`: an `unsafe trait Allocator` with `alloc`/`dealloc` taking
//! `core::alloc::Layout`, concrete allocators holding a `parent: Rc<dyn
//! Allocator>` rather than a raw function-pointer-pair header (spec.md §9
//! flags the vtable-in-first-field trick as non-portable; a trait object is
//! the idiomatic replacement it names).

mod arena;
mod bump;
mod pool;
mod system;
mod trace;

pub use arena::ArenaAllocator;
pub use bump::BumpAllocator;
pub use pool::PoolAllocator;
pub use system::SystemAllocator;
pub use trace::{TraceAllocator, TraceEvent, TraceEventKind};

use core::alloc::Layout;
use core::ptr::NonNull;
use std::rc::Rc;

/// The allocator contract (spec §4.A).
///
/// Single-threaded by design (spec §5: "not thread-safe; all state is
/// per-thread") — no implementor here is `Send`/`Sync`, and sharing one
/// across threads needs external serialisation, exactly as the spec states.
///
/// # Safety
///
/// Implementors must return pointers that are valid for `layout.size()`
/// bytes and aligned to at least `layout.align()`. `dealloc` must only be
/// called with a pointer+layout pair that this same allocator produced from
/// `alloc` (or, for delegating allocators, forwarded unchanged from one that
/// did).
pub unsafe trait Allocator {
    /// Allocates memory for `layout`, or returns `None` on failure (spec
    /// §4.A: "out-of-memory signal", never an error type).
    unsafe fn alloc(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Releases memory previously returned by [`Allocator::alloc`] on this
    /// same allocator. A no-op for allocators that only bulk-free (temp,
    /// arena).
    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout);

    /// Bytes currently handed out and not yet reclaimed, where meaningful.
    /// Purely informational; no invariant depends on it.
    fn used(&self) -> usize {
        0
    }

    /// Like [`Allocator::alloc`], but the returned memory is zeroed.
    /// Provided in terms of `alloc` plus a fill; implementors that can do
    /// better (a fresh OS page is already zero) may override it.
    unsafe fn alloc_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        let ptr = unsafe { self.alloc(layout)? };
        unsafe { ptr.as_ptr().write_bytes(0, layout.size()) };
        Some(ptr)
    }
}

/// Shared handle to a parent allocator. Single-threaded (`Rc`, not `Arc`),
/// matching spec §5's per-thread state model.
pub type DynAllocator = Rc<dyn Allocator>;

/// `free(allocator, pointer)` dispatch helper (spec §4.A). `free(null)` is a
/// no-op — expressed here as "no pointer to free" rather than a raw null,
/// since every live pointer in this crate is already a `NonNull`.
#[inline]
pub unsafe fn free<A: Allocator + ?Sized>(allocator: &A, ptr: Option<NonNull<u8>>, layout: Layout) {
    if let Some(ptr) = ptr {
        unsafe { allocator.dealloc(ptr, layout) };
    }
}
