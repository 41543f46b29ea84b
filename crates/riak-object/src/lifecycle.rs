// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Release entry points for every owned entity and collection.
//!
//! Every entity returns its storage to its own allocator when dropped, so
//! these are named, traced drops for callers that prefer an explicit
//! lifecycle API. Native-form and wire-form values are released
//! independently; neither owns storage of the other.

use allocator_api2::vec::Vec;
use riak_pb::{RpbContent, RpbLink, RpbPair};
use tracing::trace;

use crate::allocator::Allocator;
use crate::binary::Binary;
use crate::collection::Collection;
use crate::link::Link;
use crate::object::Object;
use crate::pair::Pair;

/// Release a binary.
pub fn free_binary<A: Allocator>(binary: Binary<A>) {
    drop(binary);
}

/// Release a pair collection: each element's key and value, each element,
/// then the slot array. An empty collection releases nothing.
pub fn free_pairs<A: Allocator>(pairs: Collection<Pair<A>, A>) {
    trace!(count = pairs.len(), "free pairs");
    drop(pairs);
}

/// Release a link collection: each element's bucket, key and tag, each
/// element, then the slot array. An empty collection releases nothing.
pub fn free_links<A: Allocator>(links: Collection<Link<A>, A>) {
    trace!(count = links.len(), "free links");
    drop(links);
}

/// Release an object and everything it owns.
///
/// Order: bucket, charset, content type, encoding, key, value, vtag, then
/// the index and user metadata pairs, then the links, then the object.
pub fn free_object<A: Allocator>(object: Object<A>) {
    trace!(
        indexes = object.n_indexes(),
        usermeta = object.n_usermeta(),
        links = object.n_links(),
        "free object"
    );
    drop(object);
}

/// Release every object in `objects`, then the slot array.
pub fn free_object_array<A: Allocator>(objects: Collection<Object<A>, A>) {
    trace!(count = objects.len(), "free object array");
    drop(objects);
}

/// Release an outbound wire content value.
///
/// Returns every copy made by [`Object::to_wire`] to the allocator it was
/// made in: the index, user metadata and link arrays, their byte fields, and
/// the copied scalar byte fields.
pub fn free_wire_content<W: Allocator>(content: RpbContent<W>) {
    trace!(
        indexes = content.indexes.len(),
        usermeta = content.usermeta.len(),
        links = content.links.len(),
        "free wire content"
    );
    drop(content);
}

/// Release an outbound wire pair array.
pub fn free_wire_pairs<W: Allocator>(pairs: Vec<RpbPair<W>, W>) {
    trace!(count = pairs.len(), "free wire pairs");
    drop(pairs);
}

/// Release an outbound wire link array.
pub fn free_wire_links<W: Allocator>(links: Vec<RpbLink<W>, W>) {
    trace!(count = links.len(), "free wire links");
    drop(links);
}
