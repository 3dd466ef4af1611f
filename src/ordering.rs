//! Standard memory orderings for refcount and node-flag access.
//!
//! These constants ensure consistent ordering usage across the codebase
//! and make the intent clear at each access point.

use std::sync::atomic::Ordering;

/// Ordering for the initial load in an acquire CAS loop.
/// Must observe the released bit set by a concurrent release.
pub const READ_ORD: Ordering = Ordering::Acquire;

/// Ordering for CAS success (acquire increment, release-bit claim).
/// Pairs acquire/release so teardown happens-after every live access.
pub const CAS_SUCCESS: Ordering = Ordering::AcqRel;

/// Ordering for CAS failure.
/// Only need to see the current value for the retry.
pub const CAS_FAILURE: Ordering = Ordering::Acquire;

/// Ordering for the release decrement.
/// The zero observer must see all writes made before every other decrement.
pub const DEC_ORD: Ordering = Ordering::AcqRel;

/// Ordering for freezing a node (store of the mutability flag).
/// Pairs with writers' Acquire loads of the flag.
pub const FREEZE_ORD: Ordering = Ordering::Release;

/// Ordering for reading the mutability flag during a write descent.
pub const FLAG_ORD: Ordering = Ordering::Acquire;

/// Ordering for diagnostic refcount loads.
/// The value is advisory; nothing is allowed to act on it alone.
pub const RELAXED: Ordering = Ordering::Relaxed;
