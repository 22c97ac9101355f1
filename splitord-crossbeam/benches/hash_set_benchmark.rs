//! Benchmark for SplitOrderedHashSet with epoch-based memory reclamation.
//!
//! Run with: cargo bench --package splitord-crossbeam --bench hash_set_benchmark

use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use mimalloc::MiMalloc;
use std::sync::Arc;
use std::thread;

use splitord_core::SplitOrderedHashSet;
use splitord_crossbeam::EpochGuard;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

type EpochHashSet = SplitOrderedHashSet<EpochGuard>;

// ============================================================================
// Disjoint-region adds (every thread owns its own value range)
// ============================================================================

fn split_ordered_hash_set_add(thread_count: u64, iteration_count: u64) {
    let set: Arc<EpochHashSet> = Arc::new(EpochHashSet::new());
    let mut handles = vec![];

    for t in 0..thread_count {
        let set_clone = Arc::clone(&set);
        let handle = thread::spawn(move || {
            for v in (t * iteration_count)..((t + 1) * iteration_count) {
                set_clone.add(v);
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(set.len(), (thread_count * iteration_count) as usize);
}

// ============================================================================
// Mixed operations (add + contains + remove)
// ============================================================================

fn split_ordered_hash_set_mixed(thread_count: u64, iteration_count: u64) {
    let set: Arc<EpochHashSet> = Arc::new(EpochHashSet::new());

    // Pre-populate with half the values.
    for v in 0..(thread_count * iteration_count / 2) {
        set.add(v);
    }

    let mut handles = vec![];

    for t in 0..thread_count {
        let set_clone = Arc::clone(&set);
        let handle = thread::spawn(move || {
            let base = t * iteration_count;
            for i in 0..iteration_count {
                match i % 3 {
                    0 => {
                        set_clone.add(base + i + 1_000_000);
                    }
                    1 => {
                        set_clone.contains(i / 2);
                    }
                    _ => {
                        set_clone.remove(i / 2);
                    }
                }
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

// ============================================================================
// High contention (everyone hammers the same narrow range)
// ============================================================================

fn split_ordered_hash_set_contention(thread_count: u64, iteration_count: u64) {
    let set: Arc<EpochHashSet> = Arc::new(EpochHashSet::new());
    let key_range = 100u64;

    let mut handles = vec![];

    for _ in 0..thread_count {
        let set_clone = Arc::clone(&set);
        let handle = thread::spawn(move || {
            for i in 0..iteration_count {
                let v = i % key_range;
                if i % 2 == 0 {
                    set_clone.add(v);
                } else {
                    set_clone.remove(v);
                }
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

// ============================================================================
// Criterion benchmark groups
// ============================================================================

fn concurrent_add_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_set_concurrent_add");

    for thread_count in [1, 2, 4, 8, 12, 16] {
        let bench_name = format!("split_ordered_hash_set_{:0>2}_10000", thread_count);
        group.bench_function(bench_name, |b| {
            b.iter(|| split_ordered_hash_set_add(black_box(thread_count), black_box(10_000)))
        });
    }

    group.finish();
}

fn mixed_operations_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_set_mixed_operations");

    for thread_count in [1, 2, 4, 8, 12, 16] {
        let bench_name = format!("split_ordered_hash_set_{:0>2}_10000", thread_count);
        group.bench_function(bench_name, |b| {
            b.iter(|| split_ordered_hash_set_mixed(black_box(thread_count), black_box(10_000)))
        });
    }

    group.finish();
}

fn contention_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_set_high_contention");

    for thread_count in [1, 2, 4, 8, 12, 16] {
        let bench_name = format!("split_ordered_hash_set_{:0>2}_10000", thread_count);
        group.bench_function(bench_name, |b| {
            b.iter(|| split_ordered_hash_set_contention(black_box(thread_count), black_box(10_000)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    concurrent_add_benchmark,
    mixed_operations_benchmark,
    contention_benchmark
);
criterion_main!(benches);
