// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Allocator capability.
//!
//! Every dynamic allocation the object layer makes is served by an
//! [`Allocator`] passed in by the caller: binary bytes, entity storage,
//! collection slot arrays and outbound wire copies all live in memory that
//! allocator handed out. The storage remembers its allocator, so dropping an
//! entity returns each block to the allocator that produced it.
//!
//! The trait is `allocator-api2`'s, so arenas such as `&bumpalo::Bump`
//! plug in directly. [`TrackingAllocator`] wraps the global heap with
//! accounting, limits and fault injection.
//!
//! # Invariants
//!
//! - A refused request leaves the allocator state unchanged.
//! - Every block is returned to the allocator that produced it, exactly
//!   once, when its owner is dropped.
#![allow(unsafe_code)]

use std::mem::size_of;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

pub use allocator_api2::alloc::{AllocError, Allocator, Global, Layout};
use allocator_api2::boxed::Box;
use allocator_api2::vec::Vec;
use tracing::warn;

use crate::error::{ObjectError, Result};

/// Reserve room for exactly `additional` more elements of `vec`.
pub(crate) fn reserve_exact<T, A: Allocator>(vec: &mut Vec<T, A>, additional: usize) -> Result<()> {
    vec.try_reserve_exact(additional)
        .map_err(|_| ObjectError::OutOfMemory {
            requested: size_of::<T>().saturating_mul(additional),
        })
}

/// Copy `bytes` into storage obtained from `alloc`. Empty input allocates
/// nothing.
pub(crate) fn copy_bytes<A: Allocator>(alloc: A, bytes: &[u8]) -> Result<Vec<u8, A>> {
    riak_pb::bytes_in(bytes, alloc).map_err(|_| ObjectError::OutOfMemory {
        requested: bytes.len(),
    })
}

/// Copy an optional byte field, preserving absence.
pub(crate) fn copy_optional_bytes<A: Allocator>(
    alloc: A,
    bytes: Option<&[u8]>,
) -> Result<Option<Vec<u8, A>>> {
    bytes.map(|b| copy_bytes(alloc, b)).transpose()
}

/// Move `value` into storage obtained from `alloc`.
pub(crate) fn boxed<T, A: Allocator>(value: T, alloc: A) -> Result<Box<T, A>> {
    Box::try_new_in(value, alloc).map_err(|_| ObjectError::OutOfMemory {
        requested: size_of::<T>(),
    })
}

/// Accounting allocator over the global heap with optional limits and fault
/// injection.
///
/// Tracks live bytes and live allocations so tests can assert that every
/// block was returned. Requests are numbered from zero in the order they
/// arrive; `fail_at` refuses exactly the request with that sequence number.
///
/// # Limits
///
/// - `max_bytes` bounds the live byte count.
/// - `max_allocations` bounds the number of live blocks.
///
/// A refused request does not change live counters, but it does consume a
/// sequence number.
#[derive(Debug, Default)]
pub struct TrackingAllocator {
    live_bytes: AtomicUsize,
    live_allocations: AtomicUsize,
    peak_bytes: AtomicUsize,
    requests: AtomicUsize,
    refusals: AtomicUsize,
    max_bytes: Option<usize>,
    max_allocations: Option<usize>,
    fail_at: Option<usize>,
}

impl TrackingAllocator {
    /// Create a tracker with no limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker that refuses requests once `max_bytes` would be
    /// exceeded.
    pub fn with_limits(max_bytes: usize) -> Self {
        Self {
            max_bytes: Some(max_bytes),
            ..Self::default()
        }
    }

    /// Create a tracker that refuses the request with sequence number `n`.
    pub fn failing_at(n: usize) -> Self {
        Self {
            fail_at: Some(n),
            ..Self::default()
        }
    }

    /// Set the live byte limit.
    pub fn max_bytes(mut self, max_bytes: Option<usize>) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Set the live allocation limit.
    pub fn max_allocations(mut self, max_allocations: Option<usize>) -> Self {
        self.max_allocations = max_allocations;
        self
    }

    /// Set the sequence number of the request to refuse.
    pub fn fail_at(mut self, fail_at: Option<usize>) -> Self {
        self.fail_at = fail_at;
        self
    }

    /// Bytes currently held by outstanding blocks.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Acquire)
    }

    /// Number of outstanding blocks.
    pub fn live_allocations(&self) -> usize {
        self.live_allocations.load(Ordering::Acquire)
    }

    /// Highest live byte count observed.
    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes.load(Ordering::Acquire)
    }

    /// Number of requests received, granted or refused.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Acquire)
    }

    /// Number of requests refused.
    pub fn refusals(&self) -> usize {
        self.refusals.load(Ordering::Acquire)
    }

    /// Returns `true` if no block is outstanding.
    pub fn is_balanced(&self) -> bool {
        self.live_allocations() == 0 && self.live_bytes() == 0
    }

    fn refuse(&self, seq: usize, size: usize, reason: &'static str) -> AllocError {
        self.refusals.fetch_add(1, Ordering::AcqRel);
        warn!(seq, size, reason, "allocation refused");
        AllocError
    }

    /// Reserve counters for a request of `size` bytes, or refuse it.
    fn admit(&self, size: usize) -> Result<(), AllocError> {
        let seq = self.requests.fetch_add(1, Ordering::AcqRel);
        if self.fail_at == Some(seq) {
            return Err(self.refuse(seq, size, "injected failure"));
        }
        if let Some(max) = self.max_allocations {
            let reserved = self
                .live_allocations
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                    (live < max).then_some(live + 1)
                });
            if reserved.is_err() {
                return Err(self.refuse(seq, size, "allocation limit"));
            }
        } else {
            self.live_allocations.fetch_add(1, Ordering::AcqRel);
        }
        let max_bytes = self.max_bytes.unwrap_or(usize::MAX);
        let reserved = self
            .live_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                live.checked_add(size).filter(|total| *total <= max_bytes)
            });
        match reserved {
            Ok(previous) => {
                self.peak_bytes.fetch_max(previous + size, Ordering::AcqRel);
                Ok(())
            }
            Err(_) => {
                self.live_allocations.fetch_sub(1, Ordering::AcqRel);
                Err(self.refuse(seq, size, "byte limit"))
            }
        }
    }

    /// Return the counters taken by a block of `size` bytes.
    fn retire(&self, size: usize) {
        let bytes = self
            .live_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| live.checked_sub(size));
        debug_assert!(bytes.is_ok(), "returned {size} bytes that were never handed out");
        let blocks = self
            .live_allocations
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| live.checked_sub(1));
        debug_assert!(blocks.is_ok(), "returned a block that was never handed out");
    }

    fn served(
        &self,
        layout: Layout,
        block: Result<NonNull<[u8]>, AllocError>,
    ) -> Result<NonNull<[u8]>, AllocError> {
        if block.is_err() {
            self.retire(layout.size());
        }
        block
    }
}

// SAFETY: every block comes from `Global` with the caller's layout and is
// handed back to `Global` with that same layout; the counters never influence
// the memory itself.
unsafe impl Allocator for TrackingAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        self.admit(layout.size())?;
        self.served(layout, Global.allocate(layout))
    }

    fn allocate_zeroed(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        self.admit(layout.size())?;
        self.served(layout, Global.allocate_zeroed(layout))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: `ptr` was produced by `Global` in `allocate` with `layout`,
        // as the caller guarantees for this allocator.
        unsafe { Global.deallocate(ptr, layout) };
        self.retire(layout.size());
    }
}
