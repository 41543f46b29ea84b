// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Attribute pairs: secondary index entries and user metadata.

use std::fmt;

use allocator_api2::boxed::Box;
use allocator_api2::vec::Vec;
use riak_pb::RpbPair;
use tracing::trace;

use crate::allocator::{boxed, copy_bytes, copy_optional_bytes, reserve_exact, Allocator, Global};
use crate::binary::{copy_optional, same, Binary};
use crate::collection::Collection;
use crate::error::Result;

/// A key with an optional value.
///
/// A new pair has neither. The value is only ever read or copied when it is
/// present. The pair's own storage is one block in its allocator, returned
/// after the key and value when the pair is dropped.
pub struct Pair<A: Allocator = Global> {
    fields: Box<PairFields<A>, A>,
}

struct PairFields<A: Allocator> {
    key: Option<Binary<A>>,
    value: Option<Binary<A>>,
}

impl<A: Allocator> Pair<A> {
    /// Allocate an empty pair.
    pub fn new(alloc: A) -> Result<Self> {
        let fields = PairFields { key: None, value: None };
        Ok(Self {
            fields: boxed(fields, alloc)?,
        })
    }

    /// The key, if set.
    pub fn key(&self) -> Option<&Binary<A>> {
        self.fields.key.as_ref()
    }

    /// Returns `true` if a value is set.
    pub fn has_value(&self) -> bool {
        self.fields.value.is_some()
    }

    /// The value, if set.
    pub fn value(&self) -> Option<&Binary<A>> {
        self.fields.value.as_ref()
    }

    /// Set the key, returning the previous one.
    pub fn set_key(&mut self, key: Binary<A>) -> Option<Binary<A>> {
        self.fields.key.replace(key)
    }

    /// Set the value, returning the previous one.
    pub fn set_value(&mut self, value: Binary<A>) -> Option<Binary<A>> {
        self.fields.value.replace(value)
    }

    /// Remove the value, returning it.
    pub fn take_value(&mut self) -> Option<Binary<A>> {
        self.fields.value.take()
    }

    /// Convert to wire form with copies stored in `alloc`.
    ///
    /// A missing key goes out as empty bytes; an absent value is omitted.
    pub fn to_wire<W: Allocator + Clone>(&self, alloc: W) -> Result<RpbPair<W>> {
        let key = self.key().map_or(&[][..], Binary::as_bytes);
        Ok(RpbPair {
            key: copy_bytes(alloc.clone(), key)?,
            value: copy_optional_bytes(alloc, self.value().map(Binary::as_bytes))?,
        })
    }
}

impl<A: Allocator + Clone> Pair<A> {
    /// Allocate a pair holding copies of `key` and `value`.
    pub fn from_parts(alloc: A, key: &[u8], value: Option<&[u8]>) -> Result<Self> {
        let mut pair = Self::new(alloc.clone())?;
        pair.fields.key = Some(Binary::copy_from(alloc.clone(), key)?);
        pair.fields.value = copy_optional(alloc, value)?;
        Ok(pair)
    }

    /// Allocate `count` empty pairs for the caller to populate.
    ///
    /// A count of zero allocates nothing.
    pub fn new_array(alloc: A, count: usize) -> Result<Collection<Self, A>> {
        Collection::build(alloc.clone(), count, |_| Self::new(alloc.clone()))
    }

    /// Materialize a pair from wire form.
    pub fn from_wire<W: Allocator>(alloc: A, wire: &RpbPair<W>) -> Result<Self> {
        Self::from_parts(alloc, &wire.key, wire.value.as_deref())
    }
}

/// Wire form of `pairs`, the array and every copy stored in `alloc`.
pub(crate) fn wire_pairs<A: Allocator, W: Allocator + Clone>(
    alloc: W,
    pairs: &[Pair<A>],
) -> Result<Vec<RpbPair<W>, W>> {
    let mut wire = Vec::new_in(alloc.clone());
    reserve_exact(&mut wire, pairs.len())?;
    for pair in pairs {
        wire.push(pair.to_wire(alloc.clone())?);
    }
    Ok(wire)
}

/// Convert a pair collection to wire form.
///
/// Any refused allocation aborts the conversion; the partial wire array is
/// dropped before the error is returned.
pub fn pairs_to_wire<A: Allocator, W: Allocator + Clone>(
    alloc: W,
    pairs: &Collection<Pair<A>, A>,
) -> Result<Vec<RpbPair<W>, W>> {
    trace!(count = pairs.len(), "pairs to wire");
    wire_pairs(alloc, pairs.as_slice())
}

/// Materialize a pair collection from wire form.
///
/// Any refused allocation drops every pair built so far.
pub fn pairs_from_wire<A: Allocator + Clone, W: Allocator>(
    alloc: A,
    wire: &[RpbPair<W>],
) -> Result<Collection<Pair<A>, A>> {
    trace!(count = wire.len(), "pairs from wire");
    Collection::build(alloc.clone(), wire.len(), |i| Pair::from_wire(alloc.clone(), &wire[i]))
}

impl<A: Allocator, B: Allocator> PartialEq<Pair<B>> for Pair<A> {
    fn eq(&self, other: &Pair<B>) -> bool {
        same(self.key(), other.key()) && same(self.value(), other.value())
    }
}

impl<A: Allocator> Eq for Pair<A> {}

impl<A: Allocator> fmt::Debug for Pair<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pair")
            .field("key", &self.key())
            .field("value", &self.value())
            .finish()
    }
}
