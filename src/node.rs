//! Tree node: shared lifetime metadata over the Leaf/Branch variants.
//!
//! A [`Node`] couples an [`AtomicRefCount`] (how many tree versions and
//! snapshots reference it) with a mutability flag (whether the current
//! writer may still change it in place) and the variant storage. Handles
//! are [`NodeRef`] tokens: `Copy`, free to pass around, with the live
//! count moved only by explicit [`retain`](NodeRef::retain) and
//! [`release`](NodeRef::release) calls.
//!
//! # Mutation Discipline
//!
//! A node may be mutated in place only while `mutable` is set **and** its
//! refcount is 1, as observed by the single writer. Everything else must
//! be frozen and cloned first; the clone retains the children/values, so
//! grandchildren stay shared. Freezing is irreversible: once a node has
//! been reachable from two published roots it stays frozen until torn
//! down.
//!
//! # Teardown
//!
//! [`NodeRef::release`] landing on the zero transition tears the node
//! down: a leaf releases every stored value, a branch releases every
//! child (recursing into children that also hit zero), then the
//! allocation is freed. The released bit in [`AtomicRefCount`] makes this
//! happen exactly once.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::atomic::AtomicBool;

use crate::branch::{BranchItem, BranchNode};
use crate::leaf::LeafNode;
use crate::ordering::{FLAG_ORD, FREEZE_ORD};
use crate::refcount::AtomicRefCount;
use crate::refs::RefCounted;
use crate::tree::Compare;

/// Maximum number of items per node.
///
/// A node at capacity must split before another insertion; the tree
/// splits full nodes on the way down so it never arrives at a full leaf.
pub const MAX_ITEMS: usize = 16;

// ============================================================================
//  Node
// ============================================================================

/// Variant storage: sorted values (leaf) or sorted children (branch).
#[derive(Debug)]
pub(crate) enum Variant<K, V> {
    Leaf(LeafNode<K, V>),
    Branch(BranchNode<K, V>),
}

/// A tree node: refcount, mutability flag, and variant storage.
#[derive(Debug)]
pub(crate) struct Node<K, V> {
    refs: AtomicRefCount,
    mutable: AtomicBool,
    variant: Variant<K, V>,
}

impl<K, V: RefCounted> Node<K, V> {
    /// A fresh, empty, mutable leaf with the creator's reference.
    pub(crate) fn new_leaf() -> Self {
        Self::with_variant(Variant::Leaf(LeafNode::new()))
    }

    /// A fresh, mutable branch over already-owned child references.
    pub(crate) fn new_branch(items: Vec<BranchItem<K, V>>) -> Self {
        Self::with_variant(Variant::Branch(BranchNode::from_items(items)))
    }

    fn with_variant(variant: Variant<K, V>) -> Self {
        Self {
            refs: AtomicRefCount::new(1),
            mutable: AtomicBool::new(true),
            variant,
        }
    }

    // ========================================================================
    //  Attributes
    // ========================================================================

    pub(crate) fn length(&self) -> usize {
        match &self.variant {
            Variant::Leaf(leaf) => leaf.len(),
            Variant::Branch(branch) => branch.len(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.length() == 0
    }

    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self.variant, Variant::Leaf(_))
    }

    /// Smallest key in the node. Panics if empty.
    pub(crate) fn min_key(&self) -> &K {
        match &self.variant {
            Variant::Leaf(leaf) => leaf.min_key(),
            Variant::Branch(branch) => branch.min_key(),
        }
    }

    /// Largest key in the node. Panics if empty.
    pub(crate) fn max_key(&self) -> &K {
        match &self.variant {
            Variant::Leaf(leaf) => leaf.max_key(),
            Variant::Branch(branch) => branch.max_key(),
        }
    }

    pub(crate) fn variant(&self) -> &Variant<K, V> {
        &self.variant
    }

    pub(crate) fn refs(&self) -> &AtomicRefCount {
        &self.refs
    }

    // ========================================================================
    //  Mutability
    // ========================================================================

    /// Whether the current writer may still mutate this node in place.
    pub(crate) fn is_mutable(&self) -> bool {
        self.mutable.load(FLAG_ORD)
    }

    /// Demote the node to frozen. Irreversible; idempotent so a writer
    /// can freeze a node that an earlier snapshot already froze.
    pub(crate) fn freeze(&self) {
        self.mutable.store(false, FREEZE_ORD);
    }

    fn assert_mutable(&self) {
        assert!(self.is_mutable(), "mutation of a frozen node");
    }

    // ========================================================================
    //  Lookup (recursive descent)
    // ========================================================================

    pub(crate) fn contains(&self, key: &K, compare: Compare<K>) -> bool {
        match &self.variant {
            Variant::Leaf(leaf) => leaf.contains(key, compare),
            Variant::Branch(branch) => match branch.descend(key, compare) {
                Some(child) => child.node().contains(key, compare),
                None => false,
            },
        }
    }

    // ========================================================================
    //  Mutation (leaf entry points; the tree only calls these on leaves)
    // ========================================================================

    /// Remove `key` from a leaf, releasing its value.
    ///
    /// # Panics
    /// Panics on a frozen node or on a branch.
    pub(crate) fn delete(&mut self, key: &K, compare: Compare<K>) -> bool {
        self.assert_mutable();
        match &mut self.variant {
            Variant::Leaf(leaf) => leaf.delete(key, compare),
            Variant::Branch(_) => panic!("delete on a branch node"),
        }
    }

    // ========================================================================
    //  Mutation (branch entry points)
    // ========================================================================

    /// Replace the child at `index`, releasing the displaced reference.
    ///
    /// # Panics
    /// Panics on a frozen node or on a leaf.
    pub(crate) fn set_child(&mut self, index: usize, child: NodeRef<K, V>) {
        self.assert_mutable();
        match &mut self.variant {
            Variant::Branch(branch) => branch.set_child(index, child),
            Variant::Leaf(_) => panic!("set_child on a leaf node"),
        }
    }

    /// Insert a separator/child item, adopting the handle's reference.
    ///
    /// # Panics
    /// Panics on a frozen node, a full node, or a leaf.
    pub(crate) fn insert_child(&mut self, key: K, child: NodeRef<K, V>, compare: Compare<K>) {
        self.assert_mutable();
        assert!(self.length() < MAX_ITEMS, "insert into a full node");
        match &mut self.variant {
            Variant::Branch(branch) => branch.insert_child(key, child, compare),
            Variant::Leaf(_) => panic!("insert_child on a leaf node"),
        }
    }

    // ========================================================================
    //  Split
    // ========================================================================

    /// Split a node at capacity, moving items `[len/2, len)` into a fresh
    /// mutable sibling. Returns `None` below capacity.
    ///
    /// The sibling's min key is the separator the caller propagates to
    /// the parent branch.
    ///
    /// # Panics
    /// Panics on a frozen node.
    pub(crate) fn split(&mut self) -> Option<Self> {
        self.assert_mutable();
        if self.length() < MAX_ITEMS {
            return None;
        }

        let sibling = match &mut self.variant {
            Variant::Leaf(leaf) => Variant::Leaf(leaf.split()),
            Variant::Branch(branch) => Variant::Branch(branch.split()),
        };
        Some(Self::with_variant(sibling))
    }

    // ========================================================================
    //  Teardown
    // ========================================================================

    /// Release every owned value or child and clear the items.
    fn teardown(&mut self) {
        match &mut self.variant {
            Variant::Leaf(leaf) => leaf.teardown(),
            Variant::Branch(branch) => branch.teardown(),
        }
    }
}

impl<K, V: RefCounted + Clone> Node<K, V> {
    /// Value for `key`, descending through branches. Handle copy, no
    /// retain.
    pub(crate) fn get(&self, key: &K, compare: Compare<K>) -> Option<V> {
        match &self.variant {
            Variant::Leaf(leaf) => leaf.get(key, compare),
            Variant::Branch(branch) => branch
                .descend(key, compare)
                .and_then(|child| child.node().get(key, compare)),
        }
    }

    /// Insert or replace in a leaf. Returns the previous handle on
    /// replace.
    ///
    /// # Panics
    /// Panics on a frozen node, a full node, or a branch.
    pub(crate) fn put(&mut self, key: K, value: V, compare: Compare<K>) -> Option<V> {
        self.assert_mutable();
        assert!(self.length() < MAX_ITEMS, "insert into a full node");
        match &mut self.variant {
            Variant::Leaf(leaf) => leaf.put(key, value, compare),
            Variant::Branch(_) => panic!("put on a branch node"),
        }
    }
}

impl<K: Clone, V: RefCounted + Clone> Node<K, V> {
    /// Structural copy: a fresh mutable node with the creator's
    /// reference, sharing (retaining) the source's values or children.
    ///
    /// Cloning is what makes copy-on-write cheap: only the cloned node is
    /// new, everything below it stays shared.
    pub(crate) fn clone_node(&self) -> Self {
        let variant = match &self.variant {
            Variant::Leaf(leaf) => Variant::Leaf(leaf.clone_items()),
            Variant::Branch(branch) => Variant::Branch(branch.clone_items()),
        };
        Self::with_variant(variant)
    }
}

// ============================================================================
//  NodeRef
// ============================================================================

/// A raw, manually counted node handle.
///
/// Handles are plain `Copy` tokens; copying one never touches the
/// refcount. The node stays allocated until a [`release`](Self::release)
/// lands on the zero transition.
///
/// # Safety Contract
/// - [`node_mut`](Self::node_mut) may only be used by the single writer,
///   on a node that is mutable with refcount 1 (or freshly allocated and
///   not yet published).
/// - [`retain`](Self::retain) may only be called while the caller holds a
///   live reference (directly, or through an owning parent or tree).
/// - A handle must not be used after the reference it travels with has
///   been released.
pub(crate) struct NodeRef<K, V> {
    ptr: NonNull<Node<K, V>>,
    _marker: PhantomData<Node<K, V>>,
}

impl<K, V> Clone for NodeRef<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for NodeRef<K, V> {}

// SAFETY: a NodeRef is a token for a node whose mutation and teardown are
// governed by the refcount/mutability discipline above; nodes reachable
// from a published root are frozen or exclusively owned by one writer.
// Sending or sharing tokens is safe whenever keys and values are.
unsafe impl<K: Send + Sync, V: Send + Sync> Send for NodeRef<K, V> {}
unsafe impl<K: Send + Sync, V: Send + Sync> Sync for NodeRef<K, V> {}

impl<K, V> NodeRef<K, V> {
    /// Move a node to the heap and return its handle.
    pub(crate) fn alloc(node: Node<K, V>) -> Self {
        Self {
            // SAFETY: Box::into_raw never returns null.
            ptr: unsafe { NonNull::new_unchecked(Box::into_raw(Box::new(node))) },
            _marker: PhantomData,
        }
    }

    /// Borrow the node.
    #[inline]
    pub(crate) fn node<'a>(self) -> &'a Node<K, V> {
        // SAFETY: the allocation lives until the zero-transition release,
        // and the handle contract requires a live reference for any call.
        unsafe { self.ptr.as_ref() }
    }

    /// Borrow the node mutably.
    ///
    /// Caller must be the exclusive writer of this node (see the type's
    /// safety contract); the borrow must end before any other access.
    #[inline]
    #[expect(clippy::mut_from_ref, reason = "writer exclusivity is the contract")]
    pub(crate) fn node_mut(&self) -> &mut Node<K, V> {
        // SAFETY: single-writer discipline; no concurrent or overlapping
        // borrows exist while the writer owns the node.
        unsafe { &mut *self.ptr.as_ptr() }
    }

    /// Node identity, for sharing diagnostics and tests.
    pub(crate) fn as_ptr(self) -> *const Node<K, V> {
        self.ptr.as_ptr()
    }
}

impl<K, V: RefCounted> NodeRef<K, V> {
    /// Increment the node's live count.
    ///
    /// # Panics
    /// Panics if the node has already been released.
    pub(crate) fn retain(self) {
        assert!(self.node().refs().acquire(), "retain of a released node");
    }

    /// Decrement the node's live count; on the zero transition, tear the
    /// node down (recursively releasing owned values/children) and free
    /// the allocation.
    pub(crate) fn release(self) {
        if !self.node().refs().release() {
            return;
        }

        // Zero transition: this caller owns teardown.
        // SAFETY: the pointer came from Box::into_raw and release returns
        // true exactly once; no live references remain.
        let mut node = unsafe { Box::from_raw(self.ptr.as_ptr()) };
        node.teardown();
    }

    /// Current live count. Diagnostic except under the writer's
    /// exclusivity check (single writer, so no concurrent retains can
    /// arrive between the check and the mutation).
    pub(crate) fn refcount(self) -> u64 {
        self.node().refs().refcount()
    }
}

impl<K, V> fmt::Debug for NodeRef<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({:p})", self.ptr.as_ptr())
    }
}

// ============================================================================
//  Tests
// ============================================================================
