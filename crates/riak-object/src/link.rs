// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Link references between objects.

use std::fmt;

use allocator_api2::boxed::Box;
use allocator_api2::vec::Vec;
use riak_pb::RpbLink;
use tracing::trace;

use crate::allocator::{boxed, copy_optional_bytes, reserve_exact, Allocator, Global};
use crate::binary::{copy_optional, same, Binary};
use crate::collection::Collection;
use crate::error::Result;
use crate::print::{render_link, BoundedWriter};

/// A bucket/key/tag triple describing a relation to another object.
///
/// Each component is independently optional.
pub struct Link<A: Allocator = Global> {
    fields: Box<LinkFields<A>, A>,
}

struct LinkFields<A: Allocator> {
    bucket: Option<Binary<A>>,
    key: Option<Binary<A>>,
    tag: Option<Binary<A>>,
}

impl<A: Allocator> Link<A> {
    /// Allocate an empty link.
    pub fn new(alloc: A) -> Result<Self> {
        let fields = LinkFields {
            bucket: None,
            key: None,
            tag: None,
        };
        Ok(Self {
            fields: boxed(fields, alloc)?,
        })
    }

    /// Returns `true` if a bucket is set.
    pub fn has_bucket(&self) -> bool {
        self.fields.bucket.is_some()
    }

    /// The target bucket, if set.
    pub fn bucket(&self) -> Option<&Binary<A>> {
        self.fields.bucket.as_ref()
    }

    /// Returns `true` if a key is set.
    pub fn has_key(&self) -> bool {
        self.fields.key.is_some()
    }

    /// The target key, if set.
    pub fn key(&self) -> Option<&Binary<A>> {
        self.fields.key.as_ref()
    }

    /// Returns `true` if a tag is set.
    pub fn has_tag(&self) -> bool {
        self.fields.tag.is_some()
    }

    /// The tag, if set.
    pub fn tag(&self) -> Option<&Binary<A>> {
        self.fields.tag.as_ref()
    }

    /// Set the bucket, returning the previous one.
    pub fn set_bucket(&mut self, bucket: Binary<A>) -> Option<Binary<A>> {
        self.fields.bucket.replace(bucket)
    }

    /// Set the key, returning the previous one.
    pub fn set_key(&mut self, key: Binary<A>) -> Option<Binary<A>> {
        self.fields.key.replace(key)
    }

    /// Set the tag, returning the previous one.
    pub fn set_tag(&mut self, tag: Binary<A>) -> Option<Binary<A>> {
        self.fields.tag.replace(tag)
    }

    /// Convert to wire form with copies stored in `alloc`. Absent components
    /// are omitted.
    pub fn to_wire<W: Allocator + Clone>(&self, alloc: W) -> Result<RpbLink<W>> {
        Ok(RpbLink {
            bucket: copy_optional_bytes(alloc.clone(), self.bucket().map(Binary::as_bytes))?,
            key: copy_optional_bytes(alloc.clone(), self.key().map(Binary::as_bytes))?,
            tag: copy_optional_bytes(alloc, self.tag().map(Binary::as_bytes))?,
        })
    }

    /// Render the link into `buf`.
    ///
    /// Returns the length the full rendering needs, which may exceed
    /// `buf.len()`. See [`Object::print`](crate::Object::print).
    pub fn print(&self, buf: &mut [u8]) -> usize {
        let mut out = BoundedWriter::new(buf);
        let _ = render_link(self, &mut out);
        out.finish()
    }
}

impl<A: Allocator + Clone> Link<A> {
    /// Allocate a link holding copies of the given components.
    pub fn from_parts(
        alloc: A,
        bucket: Option<&[u8]>,
        key: Option<&[u8]>,
        tag: Option<&[u8]>,
    ) -> Result<Self> {
        let mut link = Self::new(alloc.clone())?;
        link.fields.bucket = copy_optional(alloc.clone(), bucket)?;
        link.fields.key = copy_optional(alloc.clone(), key)?;
        link.fields.tag = copy_optional(alloc, tag)?;
        Ok(link)
    }

    /// Allocate `count` empty links for the caller to populate.
    ///
    /// A count of zero allocates nothing.
    pub fn new_array(alloc: A, count: usize) -> Result<Collection<Self, A>> {
        Collection::build(alloc.clone(), count, |_| Self::new(alloc.clone()))
    }

    /// Materialize a link from wire form.
    pub fn from_wire<W: Allocator>(alloc: A, wire: &RpbLink<W>) -> Result<Self> {
        Self::from_parts(
            alloc,
            wire.bucket.as_deref(),
            wire.key.as_deref(),
            wire.tag.as_deref(),
        )
    }
}

/// Wire form of `links`, the array and every copy stored in `alloc`.
pub(crate) fn wire_links<A: Allocator, W: Allocator + Clone>(
    alloc: W,
    links: &[Link<A>],
) -> Result<Vec<RpbLink<W>, W>> {
    let mut wire = Vec::new_in(alloc.clone());
    reserve_exact(&mut wire, links.len())?;
    for link in links {
        wire.push(link.to_wire(alloc.clone())?);
    }
    Ok(wire)
}

/// Convert a link collection to wire form.
///
/// Any refused allocation aborts the conversion; the partial wire array is
/// dropped before the error is returned.
pub fn links_to_wire<A: Allocator, W: Allocator + Clone>(
    alloc: W,
    links: &Collection<Link<A>, A>,
) -> Result<Vec<RpbLink<W>, W>> {
    trace!(count = links.len(), "links to wire");
    wire_links(alloc, links.as_slice())
}

/// Materialize a link collection from wire form.
///
/// Any refused allocation drops every link built so far.
pub fn links_from_wire<A: Allocator + Clone, W: Allocator>(
    alloc: A,
    wire: &[RpbLink<W>],
) -> Result<Collection<Link<A>, A>> {
    trace!(count = wire.len(), "links from wire");
    Collection::build(alloc.clone(), wire.len(), |i| Link::from_wire(alloc.clone(), &wire[i]))
}

impl<A: Allocator, B: Allocator> PartialEq<Link<B>> for Link<A> {
    fn eq(&self, other: &Link<B>) -> bool {
        same(self.bucket(), other.bucket()) && same(self.key(), other.key()) && same(self.tag(), other.tag())
    }
}

impl<A: Allocator> Eq for Link<A> {}

impl<A: Allocator> fmt::Debug for Link<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("bucket", &self.bucket())
            .field("key", &self.key())
            .field("tag", &self.tag())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::allocator::TrackingAllocator;

    #[test]
    fn missing_components_are_omitted() {
        let alloc = TrackingAllocator::new();
        let link = Link::from_parts(&alloc, Some(&b"b2"[..]), None, Some(&b"t"[..])).unwrap();
        let wire = link.to_wire(&alloc).unwrap();
        assert_eq!(wire.bucket.as_deref(), Some(&b"b2"[..]));
        assert!(wire.key.is_none());
        assert_eq!(wire.tag.as_deref(), Some(&b"t"[..]));
        let back = Link::from_wire(&alloc, &wire).unwrap();
        assert!(back.has_bucket() && !back.has_key() && back.has_tag());
        assert_eq!(back, link);
        drop((back, wire, link));
        assert!(alloc.is_balanced());
    }

    #[test]
    fn empty_link_round_trips_as_empty() {
        let alloc = TrackingAllocator::new();
        let links = Link::new_array(&alloc, 2).unwrap();
        let wire = links_to_wire(&alloc, &links).unwrap();
        assert!(wire.iter().all(|l| *l == RpbLink::default()));
        // the wire array only; empty links copy nothing
        assert_eq!(alloc.live_allocations(), 3 + 1);
        let back = links_from_wire(&alloc, &wire).unwrap();
        assert_eq!(back, links);
    }

    #[test]
    fn from_wire_failure_drops_partial_links() {
        let wire = [
            RpbLink::new(Some(&b"b"[..]), Some(&b"k"[..]), None),
            RpbLink::new(None, None, Some(&b"t"[..])),
        ];
        // array + (element + bucket + key) + (element + tag)
        for k in 0..6 {
            let alloc = TrackingAllocator::failing_at(k);
            assert!(links_from_wire(&alloc, &wire).is_err());
            assert!(alloc.is_balanced(), "leak when refusing request {k}");
        }
    }

    #[test]
    fn to_wire_failure_drops_partial_wire() {
        let setup = TrackingAllocator::new();
        let links = Collection::build(&setup, 2, |_| {
            Link::from_parts(&setup, Some(&b"b"[..]), Some(&b"k"[..]), Some(&b"t"[..]))
        })
        .unwrap();
        // array + 2 * 3 components
        for k in 0..7 {
            let alloc = TrackingAllocator::failing_at(k);
            assert!(links_to_wire(&alloc, &links).is_err());
            assert!(alloc.is_balanced(), "leak when refusing request {k}");
        }
    }

    #[test]
    fn print_renders_each_present_component() {
        let link = Link::from_parts(Global, Some(&b"people"[..]), None, Some(&b"friend"[..])).unwrap();
        let mut buf = [0u8; 128];
        let n = link.print(&mut buf);
        assert_eq!(&buf[..n], b"Link buffer: people\nLink Tag: friend\n");
        assert_eq!(buf[n], 0);
    }
}
