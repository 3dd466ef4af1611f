//! Directed integration tests for snapshot and refcount semantics.
//!
//! The copy-on-write claims that matter to users: snapshots are frozen
//! views, divergence is per-handle, and every value reference the trees
//! take is given back — no leak, no double release.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use snaptree::{Counted, MAX_ITEMS, RefCounted, SnapTree};

/// Payload that counts its drops through a shared counter.
struct Tracked {
    payload: u64,
    drops: Arc<AtomicUsize>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::Relaxed);
    }
}

/// A tree over tracked payloads, handing every creator reference to the
/// tree, plus the shared drop counter.
fn tracked_tree(range: std::ops::Range<u64>) -> (SnapTree<u64, Counted<Tracked>>, Arc<AtomicUsize>) {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut tree = SnapTree::new();
    for k in range {
        let value = Counted::new(Tracked {
            payload: k * 10,
            drops: Arc::clone(&drops),
        });
        tree.put(k, value);
        value.release();
    }
    (tree, drops)
}

#[test]
fn snapshot_sees_capture_time_state_only() {
    common::init_tracing();

    let (mut tree, _drops) = tracked_tree(0..100);
    let snapshot = tree.snapshot();

    for k in 0..50 {
        assert!(tree.delete(&k));
    }
    let value = Counted::new(Tracked {
        payload: 0,
        drops: Arc::new(AtomicUsize::new(0)),
    });
    tree.put(1_000, value);
    value.release();

    assert_eq!(snapshot.len(), 100);
    for k in 0..100 {
        assert_eq!(snapshot.get(&k).map(|v| v.get().payload), Some(k * 10));
    }
    assert!(!snapshot.contains(&1_000));

    assert_eq!(tree.len(), 51);
    assert!(!tree.contains(&10));
}

#[test]
fn dropping_all_handles_frees_every_value_exactly_once() {
    let (mut tree, drops) = tracked_tree(0..500);

    // A pile of snapshots at different versions.
    let mut snapshots = Vec::new();
    for round in 0..10_u64 {
        snapshots.push(tree.snapshot());
        for k in 0..20 {
            assert!(tree.delete(&(round * 20 + k)));
        }
    }

    assert_eq!(drops.load(Ordering::Relaxed), 0, "snapshots keep values alive");

    drop(tree);
    // Deleted values are still pinned by the older snapshots.
    assert_eq!(drops.load(Ordering::Relaxed), 0);

    drop(snapshots);
    assert_eq!(drops.load(Ordering::Relaxed), 500, "each payload dropped once");
}

#[test]
fn replace_releases_exactly_the_displaced_value() {
    let (mut tree, drops) = tracked_tree(0..10);

    let replacement = Counted::new(Tracked {
        payload: 999,
        drops: Arc::new(AtomicUsize::new(0)),
    });
    tree.put(5, replacement);
    replacement.release();

    // Only the displaced value died; everything else is still held.
    assert_eq!(drops.load(Ordering::Relaxed), 1);
    assert_eq!(tree.get(&5).map(|v| v.get().payload), Some(999));

    drop(tree);
    assert_eq!(drops.load(Ordering::Relaxed), 9);
}

#[test]
fn replace_under_snapshot_keeps_old_value_alive() {
    let (mut tree, drops) = tracked_tree(0..10);
    let snapshot = tree.snapshot();

    let replacement = Counted::new(Tracked {
        payload: 999,
        drops: Arc::new(AtomicUsize::new(0)),
    });
    tree.put(5, replacement);
    replacement.release();

    // The snapshot's leaf still holds the displaced value.
    assert_eq!(drops.load(Ordering::Relaxed), 0);
    assert_eq!(snapshot.get(&5).map(|v| v.get().payload), Some(50));
    assert_eq!(tree.get(&5).map(|v| v.get().payload), Some(999));

    drop(snapshot);
    assert_eq!(drops.load(Ordering::Relaxed), 1);
}

#[test]
fn deep_snapshot_chain_shares_until_divergence() {
    // Enough keys for height >= 2 so path copying is partial.
    let (mut tree, drops) = tracked_tree(0..(MAX_ITEMS as u64 * MAX_ITEMS as u64));
    let generations: Vec<_> = (0..5)
        .map(|round| {
            let snap = tree.snapshot();
            let value = Counted::new(Tracked {
                payload: round,
                drops: Arc::new(AtomicUsize::new(0)),
            });
            tree.put(10_000 + round, value);
            value.release();
            snap
        })
        .collect();

    for (round, snap) in generations.iter().enumerate() {
        assert_eq!(snap.len(), MAX_ITEMS * MAX_ITEMS + round);
        assert!(!snap.contains(&(10_000 + round as u64)));
    }

    drop(generations);
    drop(tree);
    assert_eq!(
        drops.load(Ordering::Relaxed),
        MAX_ITEMS * MAX_ITEMS,
        "base payloads dropped exactly once despite heavy sharing"
    );
}

#[test]
fn retained_value_outlives_all_trees() {
    let (mut tree, drops) = tracked_tree(0..10);

    let held = tree.get(&3).expect("key present");
    held.retain();

    drop(tree);
    assert_eq!(drops.load(Ordering::Relaxed), 9, "held value pinned");
    assert_eq!(held.get().payload, 30);

    held.release();
    assert_eq!(drops.load(Ordering::Relaxed), 10);
}
