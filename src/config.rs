//! Tuning knobs layered on top of the fixed invariants the allocators carry.
//!
//! These are presets for things spec.md leaves to the implementation (the
//! *initial* block size, whether to poison freed memory in debug builds) —
//! never for the fixed constants spec.md actually names (minimum block size,
//! minimum hash-table capacity, 3/4 load factor, 32-element upgrade
//! threshold). Grounded on `nebula-memory/src/arena/mod.rs`'s `ArenaConfig`
//! builder and preset methods (`production()`/`debug()`).

use crate::error::{MemoryError, MemoryResult};

/// Configuration for [`crate::alloc::ArenaAllocator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaConfig {
    /// Size of the first block requested from the parent allocator.
    pub initial_block_size: usize,
    /// Growth factor applied to `block_size` on every growth (spec.md fixes
    /// this conceptually at 2x "doubles on every growth"; this field lets a
    /// caller pick a gentler ramp without touching the doubling semantics
    /// that back the amortised-growth invariant — see
    /// [`ArenaConfig::validate`]).
    pub growth_factor: f64,
}

impl ArenaConfig {
    pub const fn new() -> Self {
        Self { initial_block_size: 4096, growth_factor: 2.0 }
    }

    /// Larger first block, standard doubling — fewer, bigger blocks.
    pub const fn production() -> Self {
        Self { initial_block_size: 64 * 1024, growth_factor: 2.0 }
    }

    /// Small first block, so spills (and therefore the block list) show up
    /// quickly under test.
    pub const fn debug() -> Self {
        Self { initial_block_size: 256, growth_factor: 2.0 }
    }

    pub fn with_initial_block_size(mut self, size: usize) -> Self {
        self.initial_block_size = size;
        self
    }

    pub fn validate(&self) -> MemoryResult<()> {
        if self.initial_block_size == 0 {
            return Err(MemoryError::InvalidConfig("initial_block_size must be > 0"));
        }
        if self.growth_factor < 1.0 {
            return Err(MemoryError::InvalidConfig("growth_factor must be >= 1.0"));
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for [`crate::alloc::PoolAllocator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolConfig {
    /// Target size (in bytes) of each block carved into slots. The actual
    /// number of slots per block is `block_size / slot_size`, at least 1.
    pub block_size: usize,
    /// Fill freed slots with this byte pattern in debug builds, to make
    /// use-after-free more likely to be observed. `None` disables filling.
    pub free_pattern: Option<u8>,
}

impl PoolConfig {
    pub const fn new() -> Self {
        Self { block_size: 4096, free_pattern: None }
    }

    pub const fn debug() -> Self {
        Self { block_size: 4096, free_pattern: Some(0xDD) }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_config_validation() {
        assert!(ArenaConfig::new().validate().is_ok());
        assert!(ArenaConfig { initial_block_size: 0, ..ArenaConfig::new() }.validate().is_err());
        assert!(ArenaConfig { growth_factor: 0.5, ..ArenaConfig::new() }.validate().is_err());
    }
}
