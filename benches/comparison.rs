//! Criterion comparison against `BTreeMap`.
//!
//! The interesting contrast is versioning: `BTreeMap` snapshots by deep
//! clone, `SnapTree` by retaining the root. Point operations should stay
//! in the same ballpark; snapshot cost should not.
//!
//! Run with: `cargo bench --bench comparison`

use std::collections::BTreeMap;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use snaptree::{Counted, RefCounted, SnapTree};

const SCATTER: u64 = 0x9e37_79b9_7f4a_7c15;
const SIZES: [u64; 2] = [1_000, 100_000];

fn put_owned(tree: &mut SnapTree<u64, Counted<u64>>, key: u64, payload: u64) {
    let value = Counted::new(payload);
    tree.put(key, value);
    value.release();
}

fn snaptree_of(n: u64) -> SnapTree<u64, Counted<u64>> {
    let mut tree = SnapTree::new();
    for i in 0..n {
        put_owned(&mut tree, i.wrapping_mul(SCATTER), i);
    }
    tree
}

fn btreemap_of(n: u64) -> BTreeMap<u64, u64> {
    (0..n).map(|i| (i.wrapping_mul(SCATTER), i)).collect()
}

fn bench_inserts(c: &mut Criterion) {
    let mut group = c.benchmark_group("scattered_inserts");
    for n in SIZES {
        group.bench_with_input(BenchmarkId::new("snaptree", n), &n, |b, &n| {
            b.iter(|| black_box(snaptree_of(n)));
        });
        group.bench_with_input(BenchmarkId::new("btreemap", n), &n, |b, &n| {
            b.iter(|| black_box(btreemap_of(n)));
        });
    }
    group.finish();
}

fn bench_gets(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_hit");
    for n in SIZES {
        let tree = snaptree_of(n);
        let map = btreemap_of(n);
        let probe = (n / 2).wrapping_mul(SCATTER);

        group.bench_with_input(BenchmarkId::new("snaptree", n), &n, |b, _| {
            b.iter(|| black_box(tree.get(&probe)));
        });
        group.bench_with_input(BenchmarkId::new("btreemap", n), &n, |b, _| {
            b.iter(|| black_box(map.get(&probe)));
        });
    }
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");
    for n in SIZES {
        let tree = snaptree_of(n);
        let map = btreemap_of(n);

        group.bench_with_input(BenchmarkId::new("snaptree_retain", n), &n, |b, _| {
            b.iter(|| black_box(tree.snapshot()));
        });
        group.bench_with_input(BenchmarkId::new("btreemap_clone", n), &n, |b, _| {
            b.iter(|| black_box(map.clone()));
        });
    }
    group.finish();
}

fn bench_snapshot_divergence(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_then_100_writes");
    for n in SIZES {
        let tree = snaptree_of(n);
        let map = btreemap_of(n);

        group.bench_with_input(BenchmarkId::new("snaptree", n), &n, |b, _| {
            b.iter(|| {
                let mut fork = tree.snapshot();
                for i in 0..100 {
                    put_owned(&mut fork, u64::MAX - i, i);
                }
                black_box(fork)
            });
        });
        group.bench_with_input(BenchmarkId::new("btreemap", n), &n, |b, _| {
            b.iter(|| {
                let mut fork = map.clone();
                for i in 0..100 {
                    fork.insert(u64::MAX - i, i);
                }
                black_box(fork)
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_inserts,
    bench_gets,
    bench_snapshot,
    bench_snapshot_divergence
);
criterion_main!(benches);
