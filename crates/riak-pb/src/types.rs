// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wire-form message types.
//!
//! Every type is generic over the allocator its storage lives in. The
//! default is the global heap; the object layer instantiates them with the
//! caller's allocator so outbound copies never touch ambient allocation.

use allocator_api2::alloc::{AllocError, Allocator, Global};
use allocator_api2::vec::Vec;

/// Owned wire bytes stored in `A`.
pub type Bytes<A = Global> = Vec<u8, A>;

/// Copy `bytes` into storage obtained from `alloc`.
///
/// An empty slice allocates nothing.
pub fn bytes_in<A: Allocator>(bytes: &[u8], alloc: A) -> Result<Bytes<A>, AllocError> {
    let mut out = Vec::new_in(alloc);
    out.try_reserve_exact(bytes.len()).map_err(|_| AllocError)?;
    out.extend_from_slice(bytes);
    Ok(out)
}

fn global_bytes(bytes: &[u8]) -> Bytes {
    let mut out = Vec::new();
    out.extend_from_slice(bytes);
    out
}

fn same_bytes<A: Allocator, B: Allocator>(a: Option<&Bytes<A>>, b: Option<&Bytes<B>>) -> bool {
    a.map(|v| &v[..]) == b.map(|v| &v[..])
}

/// A key with an optional value (secondary index entry or user metadata).
#[derive(Clone, Debug)]
pub struct RpbPair<A: Allocator = Global> {
    /// Pair key (required).
    pub key: Bytes<A>,
    /// Pair value, present only when the sender set one.
    pub value: Option<Bytes<A>>,
}

impl RpbPair {
    /// Heap-backed pair holding copies of `key` and `value`.
    pub fn new(key: &[u8], value: Option<&[u8]>) -> Self {
        Self {
            key: global_bytes(key),
            value: value.map(global_bytes),
        }
    }
}

impl<A: Allocator, B: Allocator> PartialEq<RpbPair<B>> for RpbPair<A> {
    fn eq(&self, other: &RpbPair<B>) -> bool {
        self.key[..] == other.key[..] && same_bytes(self.value.as_ref(), other.value.as_ref())
    }
}

impl<A: Allocator> Eq for RpbPair<A> {}

/// A typed reference to another object.
///
/// Each component is independently optional.
#[derive(Clone, Debug)]
pub struct RpbLink<A: Allocator = Global> {
    /// Target bucket.
    pub bucket: Option<Bytes<A>>,
    /// Target key.
    pub key: Option<Bytes<A>>,
    /// Link tag.
    pub tag: Option<Bytes<A>>,
}

impl<A: Allocator> RpbLink<A> {
    /// A link with no component set.
    pub fn empty() -> Self {
        Self {
            bucket: None,
            key: None,
            tag: None,
        }
    }
}

impl RpbLink {
    /// Heap-backed link holding copies of the given components.
    pub fn new(bucket: Option<&[u8]>, key: Option<&[u8]>, tag: Option<&[u8]>) -> Self {
        Self {
            bucket: bucket.map(global_bytes),
            key: key.map(global_bytes),
            tag: tag.map(global_bytes),
        }
    }
}

impl Default for RpbLink {
    fn default() -> Self {
        Self::empty()
    }
}

impl<A: Allocator, B: Allocator> PartialEq<RpbLink<B>> for RpbLink<A> {
    fn eq(&self, other: &RpbLink<B>) -> bool {
        same_bytes(self.bucket.as_ref(), other.bucket.as_ref())
            && same_bytes(self.key.as_ref(), other.key.as_ref())
            && same_bytes(self.tag.as_ref(), other.tag.as_ref())
    }
}

impl<A: Allocator> Eq for RpbLink<A> {}

/// Content payload of a stored object.
///
/// Bucket and key are addressing fields of the enclosing request and do not
/// appear here.
#[derive(Clone, Debug)]
pub struct RpbContent<A: Allocator = Global> {
    /// Object value (required).
    pub value: Bytes<A>,
    /// MIME content type.
    pub content_type: Option<Bytes<A>>,
    /// Character set of the value.
    pub charset: Option<Bytes<A>>,
    /// Content encoding of the value.
    pub content_encoding: Option<Bytes<A>>,
    /// Version tag assigned by the store.
    pub vtag: Option<Bytes<A>>,
    /// Links to other objects, in order.
    pub links: Vec<RpbLink<A>, A>,
    /// Last modification time, seconds since the Unix epoch.
    pub last_mod: Option<u32>,
    /// Microsecond part of the last modification time.
    pub last_mod_usecs: Option<u32>,
    /// User metadata pairs, in order.
    pub usermeta: Vec<RpbPair<A>, A>,
    /// Secondary index pairs, in order.
    pub indexes: Vec<RpbPair<A>, A>,
    /// Tombstone marker.
    pub deleted: Option<bool>,
}

impl<A: Allocator + Clone> RpbContent<A> {
    /// Content with the given value and nothing else set.
    ///
    /// The collections are empty and hold no storage in `alloc` yet.
    pub fn new_in(value: Bytes<A>, alloc: A) -> Self {
        Self {
            value,
            content_type: None,
            charset: None,
            content_encoding: None,
            vtag: None,
            links: Vec::new_in(alloc.clone()),
            last_mod: None,
            last_mod_usecs: None,
            usermeta: Vec::new_in(alloc.clone()),
            indexes: Vec::new_in(alloc),
            deleted: None,
        }
    }
}

impl RpbContent {
    /// Heap-backed content with the given value and nothing else set.
    pub fn with_value(value: &[u8]) -> Self {
        Self::new_in(global_bytes(value), Global)
    }
}

impl Default for RpbContent {
    fn default() -> Self {
        Self::with_value(&[])
    }
}

impl<A: Allocator, B: Allocator> PartialEq<RpbContent<B>> for RpbContent<A> {
    fn eq(&self, other: &RpbContent<B>) -> bool {
        self.value[..] == other.value[..]
            && same_bytes(self.content_type.as_ref(), other.content_type.as_ref())
            && same_bytes(self.charset.as_ref(), other.charset.as_ref())
            && same_bytes(self.content_encoding.as_ref(), other.content_encoding.as_ref())
            && same_bytes(self.vtag.as_ref(), other.vtag.as_ref())
            && self.links[..] == other.links[..]
            && self.last_mod == other.last_mod
            && self.last_mod_usecs == other.last_mod_usecs
            && self.usermeta[..] == other.usermeta[..]
            && self.indexes[..] == other.indexes[..]
            && self.deleted == other.deleted
    }
}

impl<A: Allocator> Eq for RpbContent<A> {}
