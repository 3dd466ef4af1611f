//! # `SnapTree`
//!
//! A copy-on-write, reference-counted, ordered tree map.
//!
//! `SnapTree<K, V>` is an immutable-snapshot key/value index: any number
//! of readers traverse frozen snapshots without locks while a writer
//! produces the next version by cloning only the nodes on the mutated
//! path. Untouched subtrees stay shared between versions until the last
//! holder releases them.
//!
//! ## Core Pieces
//!
//! | Piece | Role |
//! |-------|------|
//! | [`AtomicRefCount`] | One atomic word: live count + released bit, exactly-once release |
//! | [`RefCounted`] | Capability every stored value satisfies (`retain`/`release`/`refcount`) |
//! | [`Counted<T>`] | Manually managed shared box implementing [`RefCounted`] |
//! | `Node` (internal) | Leaf/Branch storage with a mutability flag and embedded refcount |
//! | [`SnapTree`] | Lookups, copy-on-write writes, O(1) snapshot publication |
//!
//! ## Snapshots
//!
//! ```rust
//! use snaptree::{Counted, RefCounted, SnapTree};
//!
//! let mut tree: SnapTree<u64, Counted<&str>> = SnapTree::new();
//! let v = Counted::new("one");
//! tree.put(1, v);
//! v.release(); // the tree now owns the only reference
//!
//! let frozen = tree.snapshot(); // O(1): retain + freeze the root
//! tree.delete(&1);
//!
//! assert!(!tree.contains(&1));
//! assert_eq!(frozen.get(&1).map(|v| *v.get()), Some("one"));
//! ```
//!
//! ## Concurrency Model
//!
//! Readers need no locking: nodes reachable from a published root are
//! either frozen or exclusively owned by the one in-flight writer, and
//! are never torn down while any snapshot retains them. Writers take
//! `&mut self`; callers serialize writers to the *same* handle across
//! threads (distinct snapshot handles are independent).
//!
//! ## Value Ownership
//!
//! Values are reference-counted handles, not copies. Handle copies
//! (`Clone`) are free and never touch the live count; the count moves
//! only through `retain`/`release`. The tree retains on insert and
//! releases on remove, replace, and teardown. Refcount underflow panics:
//! it means a use-after-free risk elsewhere.

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod iter;
pub mod ordering;
pub mod refcount;
pub mod refs;
pub mod tree;

mod branch;
mod leaf;
mod node;
mod tracing_helpers;

// Re-export main types for convenience
pub use iter::Iter;
pub use node::MAX_ITEMS;
pub use refcount::AtomicRefCount;
pub use refs::{Counted, RefCounted, swap};
pub use tree::{Compare, SnapTree};
