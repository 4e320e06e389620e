//! Insert/search/remove throughput on sequential and shuffled key orders.
//!
//! Sequential order degenerates the unbalanced tree into a chain, so the
//! two orders bracket the best and worst shapes the structure takes.

use bst_pool::BstMap;
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

fn keys(n: u32, shuffled: bool) -> Vec<u32> {
    let mut keys: Vec<u32> = (0..n).collect();
    if shuffled {
        keys.shuffle(&mut StdRng::seed_from_u64(42));
    }
    keys
}

fn build(keys: &[u32]) -> BstMap<u32, u64> {
    let mut t: BstMap<u32, u64> = BstMap::with_capacity(keys.len());
    for &k in keys {
        t.insert(k, u64::from(k));
    }
    t
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for (label, shuffled) in [("sequential", false), ("shuffled", true)] {
        for size in [1_000u32, 10_000] {
            let keys = keys(size, shuffled);
            group.bench_with_input(BenchmarkId::new(label, size), &keys, |b, keys| {
                b.iter(|| build(keys))
            });
        }
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    for (label, shuffled) in [("sequential", false), ("shuffled", true)] {
        for size in [1_000u32, 10_000] {
            let keys = keys(size, shuffled);
            let t = build(&keys);
            group.bench_with_input(BenchmarkId::new(label, size), &keys, |b, keys| {
                b.iter(|| {
                    let mut hits = 0u64;
                    for k in keys {
                        if t.contains_key(k) {
                            hits += 1;
                        }
                    }
                    hits
                })
            });
        }
    }
    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove");
    for (label, shuffled) in [("sequential", false), ("shuffled", true)] {
        for size in [1_000u32, 10_000] {
            let keys = keys(size, shuffled);
            let base = build(&keys);
            group.bench_with_input(BenchmarkId::new(label, size), &keys, |b, keys| {
                b.iter_batched(
                    || base.clone(),
                    |mut t| {
                        for k in keys {
                            t.remove(k).unwrap();
                        }
                        t
                    },
                    BatchSize::LargeInput,
                )
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_search, bench_remove);
criterion_main!(benches);
