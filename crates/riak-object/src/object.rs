// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The object model: one stored item.
//!
//! An [`Object`] owns every binary, pair and link reachable from it, all of
//! it stored in the allocator the object was created with. It is created
//! empty, populated through setters or by [`Object::from_wire`], and
//! destroyed by dropping it (or by [`free_object`](crate::free_object)),
//! which returns owned binaries first, then collection elements, then the
//! slot arrays and finally the object's own storage.
//!
//! # Wire mapping
//!
//! The wire-form content carries the value, the metadata fields and the three
//! collections. Bucket and key address the object at the request layer and
//! are not part of the content, so they never cross [`Object::to_wire`] or
//! [`Object::from_wire`].

use std::fmt;
use std::mem;

use allocator_api2::boxed::Box;
use riak_pb::RpbContent;
use tracing::debug;

use crate::allocator::{boxed, copy_bytes, copy_optional_bytes, Allocator, Global};
use crate::binary::{copy_optional, same, Binary};
use crate::collection::Collection;
use crate::error::Result;
use crate::link::{links_from_wire, wire_links, Link};
use crate::pair::{pairs_from_wire, wire_pairs, Pair};
use crate::print::{render_object, BoundedWriter};

/// A stored item: bucket, key, value, metadata, attributes and links.
pub struct Object<A: Allocator = Global> {
    fields: Box<Fields<A>, A>,
}

// Declaration order is drop order.
struct Fields<A: Allocator> {
    bucket: Option<Binary<A>>,
    charset: Option<Binary<A>>,
    content_type: Option<Binary<A>>,
    encoding: Option<Binary<A>>,
    key: Option<Binary<A>>,
    value: Option<Binary<A>>,
    vtag: Option<Binary<A>>,
    indexes: Collection<Pair<A>, A>,
    usermeta: Collection<Pair<A>, A>,
    links: Collection<Link<A>, A>,
    deleted: Option<bool>,
    last_mod: Option<u32>,
    last_mod_usecs: Option<u32>,
}

fn bytes_of<A: Allocator>(bin: Option<&Binary<A>>) -> Option<&[u8]> {
    bin.map(Binary::as_bytes)
}

impl<A: Allocator + Clone> Object<A> {
    /// Allocate an empty object. No field is set.
    pub fn new(alloc: A) -> Result<Self> {
        let fields = Fields {
            bucket: None,
            charset: None,
            content_type: None,
            encoding: None,
            key: None,
            value: None,
            vtag: None,
            indexes: Collection::empty_in(alloc.clone()),
            usermeta: Collection::empty_in(alloc.clone()),
            links: Collection::empty_in(alloc.clone()),
            deleted: None,
            last_mod: None,
            last_mod_usecs: None,
        };
        Ok(Self {
            fields: boxed(fields, alloc)?,
        })
    }

    /// Allocate `count` empty objects.
    ///
    /// A count of zero allocates nothing.
    pub fn new_array(alloc: A, count: usize) -> Result<Collection<Self, A>> {
        Collection::build(alloc.clone(), count, |_| Self::new(alloc.clone()))
    }

    /// Materialize an object from wire-form content.
    ///
    /// The resulting object has no bucket and no key. On a refused
    /// allocation the partially built object is dropped, returning its
    /// storage, before the error is returned.
    pub fn from_wire<W: Allocator>(alloc: A, content: &RpbContent<W>) -> Result<Self> {
        debug!(
            indexes = content.indexes.len(),
            usermeta = content.usermeta.len(),
            links = content.links.len(),
            "object from wire"
        );
        let mut obj = Self::new(alloc.clone())?;
        let f = &mut *obj.fields;
        f.value = Some(Binary::copy_from(alloc.clone(), &content.value)?);
        f.charset = copy_optional(alloc.clone(), content.charset.as_deref())?;
        f.encoding = copy_optional(alloc.clone(), content.content_encoding.as_deref())?;
        f.content_type = copy_optional(alloc.clone(), content.content_type.as_deref())?;
        f.deleted = content.deleted;
        f.last_mod = content.last_mod;
        f.last_mod_usecs = content.last_mod_usecs;
        f.vtag = copy_optional(alloc.clone(), content.vtag.as_deref())?;
        f.indexes = pairs_from_wire(alloc.clone(), &content.indexes)?;
        f.usermeta = pairs_from_wire(alloc.clone(), &content.usermeta)?;
        f.links = links_from_wire(alloc, &content.links)?;
        Ok(obj)
    }
}

impl<A: Allocator> Object<A> {
    /// Convert the content payload to wire form, every copy stored in
    /// `alloc`.
    ///
    /// Copies the value unconditionally (an object without one sends empty
    /// bytes), every optional field that is present, and every non-empty
    /// collection. The returned content owns its copies independently of
    /// `self`. The first refused allocation aborts the conversion; by then
    /// everything copied earlier in the call has been dropped.
    pub fn to_wire<W: Allocator + Clone>(&self, alloc: W) -> Result<RpbContent<W>> {
        let f = &*self.fields;
        debug!(
            indexes = f.indexes.len(),
            usermeta = f.usermeta.len(),
            links = f.links.len(),
            "object to wire"
        );
        let value = copy_bytes(alloc.clone(), bytes_of(f.value.as_ref()).unwrap_or_default())?;
        let mut content = RpbContent::new_in(value, alloc.clone());
        content.charset = copy_optional_bytes(alloc.clone(), bytes_of(f.charset.as_ref()))?;
        content.content_encoding = copy_optional_bytes(alloc.clone(), bytes_of(f.encoding.as_ref()))?;
        content.content_type = copy_optional_bytes(alloc.clone(), bytes_of(f.content_type.as_ref()))?;
        content.vtag = copy_optional_bytes(alloc.clone(), bytes_of(f.vtag.as_ref()))?;
        content.indexes = wire_pairs(alloc.clone(), f.indexes.as_slice())?;
        content.usermeta = wire_pairs(alloc.clone(), f.usermeta.as_slice())?;
        content.links = wire_links(alloc, f.links.as_slice())?;
        content.deleted = f.deleted;
        content.last_mod = f.last_mod;
        content.last_mod_usecs = f.last_mod_usecs;
        Ok(content)
    }

    /// Render the object into `buf` for diagnostics.
    ///
    /// Writes one line per present field (bucket, key, value, charset, last
    /// modification time, its microseconds, content type, content encoding,
    /// deleted flag, vtag) followed by the lines of every link. Never writes
    /// more than `buf.len() - 1` bytes plus a NUL terminator.
    ///
    /// Returns the length the complete rendering needs. A result
    /// `>= buf.len()` means the output was truncated.
    pub fn print(&self, buf: &mut [u8]) -> usize {
        let mut out = BoundedWriter::new(buf);
        // BoundedWriter never fails; truncation is reported through the total.
        let _ = render_object(self, &mut out);
        out.finish()
    }

    /// Returns `true` if the content payloads are equal, ignoring bucket and
    /// key.
    pub fn content_eq<B: Allocator>(&self, other: &Object<B>) -> bool {
        let (a, b) = (&*self.fields, &*other.fields);
        same(a.value.as_ref(), b.value.as_ref())
            && same(a.charset.as_ref(), b.charset.as_ref())
            && same(a.content_type.as_ref(), b.content_type.as_ref())
            && same(a.encoding.as_ref(), b.encoding.as_ref())
            && same(a.vtag.as_ref(), b.vtag.as_ref())
            && a.deleted == b.deleted
            && a.last_mod == b.last_mod
            && a.last_mod_usecs == b.last_mod_usecs
            && a.indexes == b.indexes
            && a.usermeta == b.usermeta
            && a.links == b.links
    }

    // ── accessors ───────────────────────────────────────────────────────

    /// The bucket, if set.
    pub fn bucket(&self) -> Option<&Binary<A>> {
        self.fields.bucket.as_ref()
    }

    /// Returns `true` if a key is set.
    pub fn has_key(&self) -> bool {
        self.fields.key.is_some()
    }

    /// The key, if set.
    pub fn key(&self) -> Option<&Binary<A>> {
        self.fields.key.as_ref()
    }

    /// The value, if set.
    pub fn value(&self) -> Option<&Binary<A>> {
        self.fields.value.as_ref()
    }

    /// Returns `true` if a charset is set.
    pub fn has_charset(&self) -> bool {
        self.fields.charset.is_some()
    }

    /// The charset, if set.
    pub fn charset(&self) -> Option<&Binary<A>> {
        self.fields.charset.as_ref()
    }

    /// Returns `true` if a last modification time is set.
    pub fn has_last_mod(&self) -> bool {
        self.fields.last_mod.is_some()
    }

    /// Last modification time in seconds since the Unix epoch.
    pub fn last_mod(&self) -> Option<u32> {
        self.fields.last_mod
    }

    /// Returns `true` if the microsecond part of the modification time is set.
    pub fn has_last_mod_usecs(&self) -> bool {
        self.fields.last_mod_usecs.is_some()
    }

    /// Microsecond part of the last modification time.
    pub fn last_mod_usecs(&self) -> Option<u32> {
        self.fields.last_mod_usecs
    }

    /// Returns `true` if a content type is set.
    pub fn has_content_type(&self) -> bool {
        self.fields.content_type.is_some()
    }

    /// The content type, if set.
    pub fn content_type(&self) -> Option<&Binary<A>> {
        self.fields.content_type.as_ref()
    }

    /// Returns `true` if a content encoding is set.
    pub fn has_content_encoding(&self) -> bool {
        self.fields.encoding.is_some()
    }

    /// The content encoding, if set.
    pub fn encoding(&self) -> Option<&Binary<A>> {
        self.fields.encoding.as_ref()
    }

    /// Returns `true` if the deleted flag is set (to either value).
    pub fn has_deleted(&self) -> bool {
        self.fields.deleted.is_some()
    }

    /// The deleted flag, if set.
    pub fn deleted(&self) -> Option<bool> {
        self.fields.deleted
    }

    /// Returns `true` if a vtag is set.
    pub fn has_vtag(&self) -> bool {
        self.fields.vtag.is_some()
    }

    /// The vtag, if set.
    pub fn vtag(&self) -> Option<&Binary<A>> {
        self.fields.vtag.as_ref()
    }

    /// Number of links.
    pub fn n_links(&self) -> usize {
        self.fields.links.len()
    }

    /// The links, in order.
    pub fn links(&self) -> &Collection<Link<A>, A> {
        &self.fields.links
    }

    /// Mutable access to the links.
    pub fn links_mut(&mut self) -> &mut Collection<Link<A>, A> {
        &mut self.fields.links
    }

    /// Number of user metadata pairs.
    pub fn n_usermeta(&self) -> usize {
        self.fields.usermeta.len()
    }

    /// The user metadata pairs, in order.
    pub fn usermeta(&self) -> &Collection<Pair<A>, A> {
        &self.fields.usermeta
    }

    /// Mutable access to the user metadata pairs.
    pub fn usermeta_mut(&mut self) -> &mut Collection<Pair<A>, A> {
        &mut self.fields.usermeta
    }

    /// Number of secondary index pairs.
    pub fn n_indexes(&self) -> usize {
        self.fields.indexes.len()
    }

    /// The secondary index pairs, in order.
    pub fn indexes(&self) -> &Collection<Pair<A>, A> {
        &self.fields.indexes
    }

    /// Mutable access to the secondary index pairs.
    pub fn indexes_mut(&mut self) -> &mut Collection<Pair<A>, A> {
        &mut self.fields.indexes
    }

    // ── setters ─────────────────────────────────────────────────────────
    //
    // Byte and collection setters take ownership of the new value and hand
    // back the displaced one; dropping it returns its storage.

    /// Set the bucket.
    pub fn set_bucket(&mut self, bucket: Binary<A>) -> Option<Binary<A>> {
        self.fields.bucket.replace(bucket)
    }

    /// Set the key.
    pub fn set_key(&mut self, key: Binary<A>) -> Option<Binary<A>> {
        self.fields.key.replace(key)
    }

    /// Set the value.
    pub fn set_value(&mut self, value: Binary<A>) -> Option<Binary<A>> {
        self.fields.value.replace(value)
    }

    /// Set the charset.
    pub fn set_charset(&mut self, charset: Binary<A>) -> Option<Binary<A>> {
        self.fields.charset.replace(charset)
    }

    /// Set the content type.
    pub fn set_content_type(&mut self, content_type: Binary<A>) -> Option<Binary<A>> {
        self.fields.content_type.replace(content_type)
    }

    /// Set the content encoding.
    pub fn set_encoding(&mut self, encoding: Binary<A>) -> Option<Binary<A>> {
        self.fields.encoding.replace(encoding)
    }

    /// Set the vtag.
    pub fn set_vtag(&mut self, vtag: Binary<A>) -> Option<Binary<A>> {
        self.fields.vtag.replace(vtag)
    }

    /// Set the deleted flag.
    pub fn set_deleted(&mut self, deleted: bool) {
        self.fields.deleted = Some(deleted);
    }

    /// Set the last modification time (seconds since the Unix epoch).
    pub fn set_last_mod(&mut self, last_mod: u32) {
        self.fields.last_mod = Some(last_mod);
    }

    /// Set the microsecond part of the last modification time.
    pub fn set_last_mod_usecs(&mut self, last_mod_usecs: u32) {
        self.fields.last_mod_usecs = Some(last_mod_usecs);
    }

    /// Replace the links.
    pub fn set_links(&mut self, links: Collection<Link<A>, A>) -> Collection<Link<A>, A> {
        mem::replace(&mut self.fields.links, links)
    }

    /// Replace the user metadata pairs.
    pub fn set_usermeta(&mut self, usermeta: Collection<Pair<A>, A>) -> Collection<Pair<A>, A> {
        mem::replace(&mut self.fields.usermeta, usermeta)
    }

    /// Replace the secondary index pairs.
    pub fn set_indexes(&mut self, indexes: Collection<Pair<A>, A>) -> Collection<Pair<A>, A> {
        mem::replace(&mut self.fields.indexes, indexes)
    }
}

impl<A: Allocator, B: Allocator> PartialEq<Object<B>> for Object<A> {
    fn eq(&self, other: &Object<B>) -> bool {
        same(self.bucket(), other.bucket()) && same(self.key(), other.key()) && self.content_eq(other)
    }
}

impl<A: Allocator> Eq for Object<A> {}

impl<A: Allocator> fmt::Debug for Object<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = &*self.fields;
        f.debug_struct("Object")
            .field("bucket", &fields.bucket)
            .field("key", &fields.key)
            .field("value", &fields.value)
            .field("charset", &fields.charset)
            .field("content_type", &fields.content_type)
            .field("encoding", &fields.encoding)
            .field("vtag", &fields.vtag)
            .field("deleted", &fields.deleted)
            .field("last_mod", &fields.last_mod)
            .field("last_mod_usecs", &fields.last_mod_usecs)
            .field("indexes", &fields.indexes)
            .field("usermeta", &fields.usermeta)
            .field("links", &fields.links)
            .finish()
    }
}
