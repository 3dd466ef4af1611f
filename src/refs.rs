//! Reference-counted value handles.
//!
//! The tree never copies stored values. It holds *handles* and moves their
//! live counts through the [`RefCounted`] capability: retain on insert,
//! release on remove, replace, or node teardown. This module provides the
//! capability trait, the [`swap`] slot-replacement helper, and
//! [`Counted<T>`], a concrete manually managed shared box.
//!
//! # Handle Model
//!
//! Handles are plain tokens. Copying a handle (via `Clone`) is free and
//! never touches the live count; only [`retain`](RefCounted::retain) and
//! [`release`](RefCounted::release) do. A handle stays valid for as long as
//! *someone* holds a live reference to the value behind it; using a handle
//! whose value has been fully released is a caller bug, reported by the
//! released-bit check on the next retain.
//!
//! `Arc<T>` deliberately does not implement [`RefCounted`]: `Arc` ties the
//! handle to the count (dropping a handle releases), while this model keeps
//! handles free and counts explicit. Mixing the two double-counts silently.

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use crate::refcount::AtomicRefCount;

// ============================================================================
//  RefCounted
// ============================================================================

/// The capability every value stored in a tree must satisfy.
///
/// Implementations must uphold:
///
/// - `Clone` (required separately by the tree) is a plain handle copy and
///   does not change the live count.
/// - `retain` of a fully released value is a fault and panics.
/// - `release` past zero is a fault and panics.
/// - Release observing the zero transition tears the value down exactly
///   once, no matter how many holders release concurrently.
pub trait RefCounted {
    /// Increment the live count.
    ///
    /// May only be called while the caller holds a live reference.
    fn retain(&self);

    /// Decrement the live count, tearing down on the zero transition.
    fn release(&self);

    /// Current live count. Diagnostic only.
    fn refcount(&self) -> u64;
}

/// Replace the value in a slot, retain-then-release.
///
/// Retains `new`, stores it, and releases the previous value only after the
/// slot already holds the new one, so the slot never dangles. Returns the
/// previous handle; it is only valid if the caller holds another live
/// reference to the value behind it.
#[inline]
pub fn swap<V: RefCounted>(slot: &mut V, new: V) -> V {
    new.retain();
    let old = mem::replace(slot, new);
    old.release();
    old
}

// ============================================================================
//  Counted<T>
// ============================================================================

struct CountedInner<T> {
    refs: AtomicRefCount,
    value: T,
}

/// A manually managed, reference-counted shared box.
///
/// `Counted::new` allocates the value with a live count of 1 (the
/// creator's reference). Handle copies are free `Copy` tokens; the
/// allocation is dropped by whichever [`release`](RefCounted::release)
/// lands on the zero transition, exactly once.
///
/// ```rust
/// use snaptree::refs::{Counted, RefCounted};
///
/// let v = Counted::new("payload".to_string());
/// v.retain();
/// assert_eq!(v.refcount(), 2);
/// v.release();
/// assert_eq!(v.get().as_str(), "payload");
/// v.release(); // zero transition: payload dropped, allocation freed
/// ```
pub struct Counted<T> {
    ptr: NonNull<CountedInner<T>>,
    _marker: PhantomData<CountedInner<T>>,
}

impl<T> Counted<T> {
    /// Allocate `value` with a live count of 1.
    #[must_use]
    pub fn new(value: T) -> Self {
        let inner = Box::new(CountedInner {
            refs: AtomicRefCount::new(1),
            value,
        });

        Self {
            // SAFETY: Box::into_raw never returns null.
            ptr: unsafe { NonNull::new_unchecked(Box::into_raw(inner)) },
            _marker: PhantomData,
        }
    }

    /// Borrow the payload.
    ///
    /// The caller must hold a live reference; after the value has been
    /// fully released the handle dangles and access is undefined.
    #[inline]
    #[must_use]
    pub fn get(&self) -> &T {
        let inner = self.inner();
        debug_assert!(!inner.refs.is_released(), "access to released value");
        &inner.value
    }

    #[inline]
    fn inner(&self) -> &CountedInner<T> {
        // SAFETY: the allocation lives until the zero-transition release,
        // and the handle contract requires a live reference for any call.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> RefCounted for Counted<T> {
    #[inline]
    fn retain(&self) {
        assert!(self.inner().refs.acquire(), "retain of released value");
    }

    #[inline]
    fn release(&self) {
        if self.inner().refs.release() {
            // Zero transition: this caller owns teardown.
            // SAFETY: the pointer came from Box::into_raw, the released
            // bit guarantees no further acquire succeeds, and release
            // returns true exactly once.
            drop(unsafe { Box::from_raw(self.ptr.as_ptr()) });
        }
    }

    #[inline]
    fn refcount(&self) -> u64 {
        self.inner().refs.refcount()
    }
}

impl<T> Clone for Counted<T> {
    /// Copies the handle. Does not retain.
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Counted<T> {}

// SAFETY: Counted is a handle to a heap allocation shared across threads.
// The payload is only dropped on the exactly-once zero transition, and all
// count updates go through AtomicRefCount. Sending or sharing handles is
// safe whenever the payload itself is Send + Sync.
unsafe impl<T: Send + Sync> Send for Counted<T> {}
unsafe impl<T: Send + Sync> Sync for Counted<T> {}

impl<T: fmt::Debug> fmt::Debug for Counted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counted")
            .field("refcount", &self.refcount())
            .field("value", self.get())
            .finish()
    }
}

// ============================================================================
//  Tests
// ============================================================================
