// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Owned byte buffer stored in an allocator.

use std::fmt;

use allocator_api2::vec::Vec;

use crate::allocator::{copy_bytes, Allocator, Global};
use crate::error::Result;

/// An owned byte string.
///
/// Every string or byte-valued field of the object model is a `Binary`. The
/// bytes live in storage obtained from the allocator that created the binary
/// and are returned to it when the binary is dropped. An empty binary holds
/// no storage.
///
/// Equality compares bytes only.
pub struct Binary<A: Allocator = Global> {
    bytes: Vec<u8, A>,
}

impl<A: Allocator> Binary<A> {
    /// Copy `bytes` into a new binary stored in `alloc`.
    pub fn copy_from(alloc: A, bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            bytes: copy_bytes(alloc, bytes)?,
        })
    }

    /// View the bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the binary holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The allocator the bytes live in.
    pub fn allocator(&self) -> &A {
        self.bytes.allocator()
    }

    /// Render the bytes for diagnostics.
    ///
    /// Printable ASCII is written as-is; every other byte is written as a
    /// `\xNN` escape.
    pub fn render(&self, out: &mut impl fmt::Write) -> fmt::Result {
        for &byte in self.bytes.iter() {
            if byte.is_ascii_graphic() || byte == b' ' {
                out.write_char(char::from(byte))?;
            } else {
                write!(out, "\\x{byte:02x}")?;
            }
        }
        Ok(())
    }
}

impl<A: Allocator + Clone> Binary<A> {
    /// Copy of this binary stored in the same allocator.
    pub fn duplicate(&self) -> Result<Self> {
        Self::copy_from(self.allocator().clone(), &self.bytes)
    }
}

impl<A: Allocator, B: Allocator> PartialEq<Binary<B>> for Binary<A> {
    fn eq(&self, other: &Binary<B>) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<A: Allocator> Eq for Binary<A> {}

impl<A: Allocator> PartialEq<[u8]> for Binary<A> {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl<A: Allocator> AsRef<[u8]> for Binary<A> {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl<A: Allocator> fmt::Debug for Binary<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Binary(\"")?;
        self.render(f)?;
        f.write_str("\")")
    }
}

/// Copy of an optional binary, preserving absence.
pub(crate) fn copy_optional<A: Allocator>(alloc: A, bytes: Option<&[u8]>) -> Result<Option<Binary<A>>> {
    bytes.map(|b| Binary::copy_from(alloc, b)).transpose()
}

/// Compare optional binaries across allocators.
pub(crate) fn same<A: Allocator, B: Allocator>(a: Option<&Binary<A>>, b: Option<&Binary<B>>) -> bool {
    a.map(Binary::as_bytes) == b.map(Binary::as_bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::allocator::TrackingAllocator;
    use bumpalo::Bump;

    #[test]
    fn copy_lives_in_the_tracker_until_dropped() {
        let alloc = TrackingAllocator::new();
        let bin = Binary::copy_from(&alloc, b"hello").unwrap();
        assert_eq!(alloc.live_bytes(), 5);
        assert_eq!(bin.as_bytes(), b"hello");
        drop(bin);
        assert!(alloc.is_balanced());
    }

    #[test]
    fn refused_copy_holds_nothing() {
        let alloc = TrackingAllocator::failing_at(0);
        assert!(Binary::copy_from(&alloc, b"x").is_err());
        assert!(alloc.is_balanced());
    }

    #[test]
    fn empty_binary_is_present_but_unallocated() {
        let alloc = TrackingAllocator::new();
        let bin = Binary::copy_from(&alloc, b"").unwrap();
        assert!(bin.is_empty());
        assert_eq!(alloc.requests(), 0);
    }

    #[test]
    fn duplicate_uses_the_same_allocator() {
        let alloc = TrackingAllocator::new();
        let bin = Binary::copy_from(&alloc, b"abc").unwrap();
        let copy = bin.duplicate().unwrap();
        assert_eq!(alloc.live_allocations(), 2);
        assert_eq!(copy, bin);
        drop((bin, copy));
        assert!(alloc.is_balanced());
    }

    #[test]
    fn arena_backed_binary_reads_out_of_the_arena() {
        let arena = Bump::new();
        let bin = Binary::copy_from(&arena, b"in the arena").unwrap();
        assert!(arena.allocated_bytes() >= bin.len());
        assert_eq!(bin, Binary::copy_from(Global, b"in the arena").unwrap());
    }

    #[test]
    fn render_escapes_non_printable() {
        let bin = Binary::copy_from(Global, b"a b\n\xff").unwrap();
        let mut out = String::new();
        bin.render(&mut out).unwrap();
        assert_eq!(out, "a b\\x0a\\xff");
    }
}
