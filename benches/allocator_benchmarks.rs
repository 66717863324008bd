//! Throughput benchmarks for the allocator family, mirroring
//! `nebula-memory`'s criterion setup (one group per allocator, varying
//! allocation size).

use std::rc::Rc;

use corert::{ArenaAllocator, Allocator, BumpAllocator, DynAllocator, PoolAllocator, SystemAllocator};
use corert::config::{ArenaConfig, PoolConfig};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn system_allocator(c: &mut Criterion) {
    let sys = SystemAllocator::new();
    c.bench_function("system_allocator_alloc_dealloc", |b| {
        b.iter(|| {
            let layout = std::alloc::Layout::from_size_align(black_box(64), 8).unwrap();
            let ptr = unsafe { sys.alloc(layout) }.unwrap();
            unsafe { sys.dealloc(ptr, layout) };
        })
    });
}

fn bump_allocator(c: &mut Criterion) {
    c.bench_function("bump_allocator_sequential", |b| {
        b.iter(|| {
            let mut buf = vec![0u8; 64 * 1024];
            let bump = BumpAllocator::new(&mut buf);
            let layout = std::alloc::Layout::from_size_align(32, 8).unwrap();
            for _ in 0..black_box(512) {
                unsafe { bump.alloc(layout) };
            }
        })
    });
}

fn arena_allocator(c: &mut Criterion) {
    let parent: DynAllocator = Rc::new(SystemAllocator::new());
    c.bench_function("arena_allocator_growth", |b| {
        b.iter(|| {
            let arena = ArenaAllocator::new(Rc::clone(&parent), ArenaConfig::new());
            let layout = std::alloc::Layout::from_size_align(48, 8).unwrap();
            for _ in 0..black_box(2_000) {
                unsafe { arena.alloc(layout) };
            }
        })
    });
}

fn pool_allocator(c: &mut Criterion) {
    let parent: DynAllocator = Rc::new(SystemAllocator::new());
    let layout = std::alloc::Layout::from_size_align(24, 8).unwrap();
    c.bench_function("pool_allocator_round_trip", |b| {
        let pool = PoolAllocator::new(Rc::clone(&parent), layout, PoolConfig::new());
        b.iter(|| {
            let p = unsafe { pool.alloc(layout) }.unwrap();
            unsafe { pool.dealloc(p, layout) };
        })
    });
}

criterion_group!(benches, system_allocator, bump_allocator, arena_allocator, pool_allocator);
criterion_main!(benches);
