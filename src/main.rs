//! Debug binary for snapshot-churn workloads.
//!
//! Exercises copy-on-write divergence under repeated snapshotting and
//! reports timings, so path-cloning regressions show up without a full
//! bench run.
//!
//! Run with:
//! ```bash
//! RUST_LOG=snaptree=debug cargo run --release --features tracing
//! ```

#![allow(clippy::cast_precision_loss)]

use std::time::Instant;

use snaptree::{Counted, RefCounted, SnapTree};

// =============================================================================
// Workload parameters
// =============================================================================

const BASE_KEYS: u64 = 100_000;
const SNAPSHOT_ROUNDS: usize = 100;
const WRITES_PER_ROUND: u64 = 1_000;

/// Fibonacci-hash key scatter, so inserts land across the whole tree.
const SCATTER: u64 = 0x9e37_79b9_7f4a_7c15;

fn scattered(i: u64) -> u64 {
    i.wrapping_mul(SCATTER)
}

fn put_owned(tree: &mut SnapTree<u64, Counted<u64>>, key: u64, payload: u64) {
    let value = Counted::new(payload);
    tree.put(key, value);
    value.release();
}

// =============================================================================
// Phases
// =============================================================================

fn build_base() -> SnapTree<u64, Counted<u64>> {
    let start = Instant::now();
    let mut tree = SnapTree::new();
    for i in 0..BASE_KEYS {
        put_owned(&mut tree, scattered(i), i);
    }
    let elapsed = start.elapsed();
    println!(
        "build: {BASE_KEYS} keys in {elapsed:?} ({:.0} keys/ms), height {}",
        BASE_KEYS as f64 / elapsed.as_millis().max(1) as f64,
        tree.height(),
    );
    tree
}

fn churn(tree: &mut SnapTree<u64, Counted<u64>>) {
    let start = Instant::now();
    let mut snapshots = Vec::with_capacity(SNAPSHOT_ROUNDS);

    for round in 0..SNAPSHOT_ROUNDS {
        snapshots.push(tree.snapshot());
        let base = (round as u64 + 1) * BASE_KEYS;
        for i in 0..WRITES_PER_ROUND {
            put_owned(tree, scattered(base + i), i);
        }
    }
    let write_time = start.elapsed();

    // Every snapshot must still see exactly its own version's size.
    let verify_start = Instant::now();
    for (round, snapshot) in snapshots.iter().enumerate() {
        let expected = BASE_KEYS as usize + round * WRITES_PER_ROUND as usize;
        assert_eq!(snapshot.len(), expected, "snapshot {round} drifted");
    }
    let verify_time = verify_start.elapsed();

    let drop_start = Instant::now();
    drop(snapshots);
    let drop_time = drop_start.elapsed();

    println!(
        "churn: {SNAPSHOT_ROUNDS} rounds x {WRITES_PER_ROUND} writes in {write_time:?}, \
         verify {verify_time:?}, snapshot teardown {drop_time:?}",
    );
    println!(
        "final: {} keys, height {}",
        tree.len(),
        tree.height(),
    );
}

fn scan(tree: &SnapTree<u64, Counted<u64>>) {
    let start = Instant::now();
    let mut count = 0_usize;
    let mut previous: Option<u64> = None;
    for (key, _) in tree {
        if let Some(p) = previous {
            assert!(p < *key, "iteration order violated at {key}");
        }
        previous = Some(*key);
        count += 1;
    }
    println!("scan: {count} entries in order, {:?}", start.elapsed());
}

fn main() {
    let mut tree = build_base();
    churn(&mut tree);
    scan(&tree);
}
