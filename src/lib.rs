//! `corert`: the allocator family, scoped-resource registry, and
//! adaptively-indexed array substrate backing a small systems language's
//! runtime.
//!
//! Grounded on `nebula-memory`'s module layout (`allocator/`, `arena/`,
//! `pool/`, `traits/`) and its top-level `lib.rs`'s `pub mod` / `pub use`
//! prelude pattern, narrowed to the single container shape and allocator
//! family this crate actually needs (spec.md §1: "not a general-purpose
//! collections library").
//!
//! # Layout
//! - [`alloc`] — the allocator contract and its four implementations
//!   (system, temp/bump, arena, pool, trace).
//! - [`disposable`] — the scoped-resource registry and recovery escape.
//! - [`indexer`] — the pluggable keyed-lookup strategy (linear, hash).
//! - [`array`] — the array substrate: [`array::RawArray`] (sequence) and
//!   [`array::KeyedArray`] (map/set).
//! - [`intern`] — the name interner built on top of the above.

pub mod alloc;
pub mod array;
pub mod config;
pub mod disposable;
pub mod error;
pub mod indexer;
pub mod intern;
pub mod utils;

pub use alloc::{Allocator, ArenaAllocator, BumpAllocator, DynAllocator, PoolAllocator, SystemAllocator, TraceAllocator};
pub use array::{KeyedArray, RawArray, SetElem};
pub use config::{ArenaConfig, PoolConfig};
pub use disposable::{make_disposable, panic_in, recover, Disposable, RecoveryEscape};
pub use error::{MemoryError, MemoryResult};
pub use indexer::{HashIndexer, Indexer, Keyed, LinearIndexer, PutOutcome};
pub use intern::{InternedName, NameInterner};
