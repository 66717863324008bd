//! Error types for `corert`.
//!
//! Allocation failure is the only truly "expected" error in this crate
//! (spec §7): every allocator-facing API returns `Option`/`bool` for that
//! case rather than an error type, exactly as the design calls for. The
//! [`MemoryError`] type here covers the layer above the allocators —
//! configuration validation and contract violations that are programmer
//! errors rather than runtime conditions, but that we'd still rather report
//! than `panic!` on on a library boundary.

use thiserror::Error;

/// Errors surfaced by configuration and setup code (not by the hot
/// allocation paths, which stay on `Option`/`bool` per spec §7).
#[derive(Debug, Error)]
pub enum MemoryError {
    /// A configuration value failed validation (e.g. a growth factor < 1.0).
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Result alias used throughout the configuration/setup layer.
pub type MemoryResult<T> = Result<T, MemoryError>;
