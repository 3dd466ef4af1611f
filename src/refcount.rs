//! Atomic reference counting with exactly-once release.
//!
//! [`AtomicRefCount`] packs a live count and a one-bit "released" flag into
//! a single `u64`. It guards two kinds of objects in this crate: tree nodes
//! (shared by however many snapshots retain them) and stored values
//! (caller-held references tracked through [`RefCounted`]).
//!
//! # Concurrency Model
//! 1. Acquire: CAS retry loop. Fails without side effects once the released
//!    bit is set.
//! 2. Release: atomic decrement. The caller whose decrement lands on zero
//!    claims teardown by a CAS from `0` to the released bit; every other
//!    caller sees `false`. Teardown therefore happens at most once under
//!    arbitrary concurrent release calls.
//!
//! ```rust
//! use snaptree::refcount::AtomicRefCount;
//!
//! let rc = AtomicRefCount::new(1);
//! assert!(rc.acquire());
//! assert!(!rc.release()); // one reference still live
//! assert!(rc.release());  // zero transition: caller owns teardown
//! assert!(!rc.acquire()); // released, can never be revived
//! ```
//!
//! [`RefCounted`]: crate::refs::RefCounted

use std::sync::atomic::AtomicU64;

use crate::ordering::{CAS_FAILURE, CAS_SUCCESS, DEC_ORD, READ_ORD, RELAXED};


// ============================================================================
//  Bit Constants
// ============================================================================

/// Released bit: the count reached zero and teardown was claimed.
///
/// Bit 62 keeps the flag clear of any realistic live count while leaving
/// the top bit free, so a flagged value is never mistaken for a count.
const RELEASED_BIT: u64 = 1 << 62;

/// Mask extracting the live count from the packed word.
const COUNT_MASK: u64 = RELEASED_BIT - 1;

/// Default attempt bound for [`AtomicRefCount::try_acquire`].
pub const DEFAULT_ACQUIRE_ATTEMPTS: usize = 3;

// ============================================================================
//  AtomicRefCount
// ============================================================================

/// An atomic reference counter with a released bit.
///
/// The reference cannot be acquired once the released bit has been set.
///
/// # Layout
/// Bit 62: `released` | Bits 0-61: live count
///
/// # Safety Contract
/// [`acquire`](Self::acquire) may only be called while the caller already
/// holds a live reference, so the observed count is at least 1. Without
/// that, an acquire racing the zero transition could resurrect an object
/// whose teardown is already committed. Node and value handles in this
/// crate uphold the contract by retaining through an owner.
#[derive(Debug)]
pub struct AtomicRefCount {
    refs: AtomicU64,
}

impl AtomicRefCount {
    /// Create a counter with an initial live count.
    ///
    /// `refs` is normally 1, representing the creator's own reference.
    #[must_use]
    pub const fn new(refs: u64) -> Self {
        Self {
            refs: AtomicU64::new(refs),
        }
    }

    /// Increment the live count.
    ///
    /// Returns `true` if the reference was acquired, or `false` with no net
    /// effect if the reference has already been released. Lock-free: the
    /// CAS loop retries under contention and never blocks.
    #[inline]
    #[must_use]
    pub fn acquire(&self) -> bool {
        let mut current: u64 = self.refs.load(READ_ORD);
        loop {
            if current & RELEASED_BIT != 0 {
                return false;
            }

            match self
                .refs
                .compare_exchange_weak(current, current + 1, CAS_SUCCESS, CAS_FAILURE)
            {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Bounded acquire for callers that can fall back to fresh allocation.
    ///
    /// Attempts the CAS at most `attempts` times and gives up on sustained
    /// contention. A pooled-storage caller treats `false` as "allocate new"
    /// rather than spinning. Plain node/value retains must use
    /// [`acquire`](Self::acquire) instead, which never fails spuriously.
    #[inline]
    #[must_use]
    pub fn try_acquire(&self, attempts: usize) -> bool {
        let mut current: u64 = self.refs.load(READ_ORD);
        for _ in 0..attempts {
            if current & RELEASED_BIT != 0 {
                return false;
            }

            match self
                .refs
                .compare_exchange_weak(current, current + 1, CAS_SUCCESS, CAS_FAILURE)
            {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
        false
    }

    /// Decrement the live count.
    ///
    /// Returns `true` exactly once, for the caller whose decrement lands on
    /// the zero transition and whose CAS from "zero, not released" to
    /// "zero, released" succeeds. That caller owns teardown. Every other
    /// caller gets `false`.
    ///
    /// # Panics
    /// Panics on refcount underflow: a release of a counter whose count is
    /// already zero or whose released bit is set. Underflow means a
    /// use-after-free risk elsewhere and is never ignored.
    #[inline]
    pub fn release(&self) -> bool {
        let previous: u64 = self.refs.fetch_sub(1, DEC_ORD);
        assert!(
            previous & RELEASED_BIT == 0 && previous != 0,
            "refcount underflow: released more times than retained"
        );

        if previous > 1 {
            return false;
        }

        // Count reached zero: claim teardown. The CAS loses only to a
        // concurrent acquire, which the safety contract forbids here.
        self.refs
            .compare_exchange(0, RELEASED_BIT, CAS_SUCCESS, CAS_FAILURE)
            .is_ok()
    }

    /// Current live count.
    ///
    /// Diagnostic only: the value may be stale by the time it is observed,
    /// so nothing may act on it without a subsequent acquire or release.
    #[inline]
    #[must_use]
    pub fn refcount(&self) -> u64 {
        self.refs.load(RELAXED) & COUNT_MASK
    }

    /// Whether the released bit has been set.
    ///
    /// Diagnostic only, same caveat as [`refcount`](Self::refcount).
    #[inline]
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.refs.load(READ_ORD) & RELEASED_BIT != 0
    }
}

// ============================================================================
//  Tests
// ============================================================================
