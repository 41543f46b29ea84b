// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wire-form round trips preserve content and presence.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use bumpalo::Bump;
use proptest::prelude::*;
use riak_object::riak_pb::{bytes_in, Bytes, RpbContent, RpbLink, RpbPair};
use riak_object::{free_object, free_wire_content, Binary, Global, Object, TrackingAllocator};

fn bytes() -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 0..12).prop_map(|v| bytes_in(&v, Global).unwrap())
}

fn opt_bytes() -> impl Strategy<Value = Option<Bytes>> {
    prop::option::of(bytes())
}

fn pair() -> impl Strategy<Value = RpbPair> {
    (bytes(), opt_bytes()).prop_map(|(key, value)| RpbPair { key, value })
}

fn link() -> impl Strategy<Value = RpbLink> {
    (opt_bytes(), opt_bytes(), opt_bytes()).prop_map(|(bucket, key, tag)| RpbLink { bucket, key, tag })
}

fn content() -> impl Strategy<Value = RpbContent> {
    (
        bytes(),
        (opt_bytes(), opt_bytes(), opt_bytes(), opt_bytes()),
        prop::collection::vec(link(), 0..3),
        (any::<Option<u32>>(), any::<Option<u32>>(), any::<Option<bool>>()),
        prop::collection::vec(pair(), 0..3),
        prop::collection::vec(pair(), 0..3),
    )
        .prop_map(
            |(value, (content_type, charset, content_encoding, vtag), links, (last_mod, last_mod_usecs, deleted), usermeta, indexes)| {
                let mut content = RpbContent::new_in(value, Global);
                content.content_type = content_type;
                content.charset = charset;
                content.content_encoding = content_encoding;
                content.vtag = vtag;
                content.last_mod = last_mod;
                content.last_mod_usecs = last_mod_usecs;
                content.deleted = deleted;
                content.links.extend(links);
                content.usermeta.extend(usermeta);
                content.indexes.extend(indexes);
                content
            },
        )
}

proptest! {
    #[test]
    fn wire_to_object_to_wire_is_identity(content in content()) {
        let alloc = TrackingAllocator::new();
        let obj = Object::from_wire(&alloc, &content).unwrap();
        prop_assert_eq!(obj.n_links(), content.links.len());
        prop_assert_eq!(obj.indexes().is_allocated(), !content.indexes.is_empty());
        prop_assert_eq!(obj.usermeta().is_allocated(), !content.usermeta.is_empty());

        let wire = obj.to_wire(&alloc).unwrap();
        prop_assert_eq!(&wire, &content);

        let again = Object::from_wire(&alloc, &wire).unwrap();
        prop_assert!(again.content_eq(&obj));

        free_wire_content(wire);
        free_object(obj);
        free_object(again);
        prop_assert!(alloc.is_balanced());
    }

    #[test]
    fn arena_and_heap_objects_agree(content in content()) {
        let arena = Bump::new();
        let in_arena = Object::from_wire(&arena, &content).unwrap();
        let on_heap = Object::from_wire(Global, &content).unwrap();
        prop_assert!(in_arena.content_eq(&on_heap));
        prop_assert_eq!(&in_arena.to_wire(&arena).unwrap(), &on_heap.to_wire(Global).unwrap());
    }
}

#[test]
fn bucket_and_key_do_not_cross_the_wire() {
    let alloc = TrackingAllocator::new();
    let mut obj = Object::new(&alloc).unwrap();
    let _ = obj.set_bucket(Binary::copy_from(&alloc, b"b").unwrap());
    let _ = obj.set_key(Binary::copy_from(&alloc, b"k").unwrap());
    let wire = obj.to_wire(&alloc).unwrap();
    // an object without a value sends empty bytes
    assert_eq!(wire, RpbContent::default());
    let back = Object::from_wire(&alloc, &wire).unwrap();
    assert!(back.bucket().is_none() && !back.has_key());
    assert!(back.value().unwrap().is_empty());
    drop((back, wire, obj));
    assert!(alloc.is_balanced());
}
