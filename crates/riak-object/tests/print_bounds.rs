// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bounded printing: the return value is the full length, the buffer only
//! ever receives `len - 1` bytes plus a terminator.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use riak_object::riak_pb::{bytes_in, RpbContent, RpbLink, RpbPair};
use riak_object::{pairs_from_wire, print_pairs, Global, Object};

const SENTINEL: u8 = 0xEE;

fn sample() -> Object {
    let mut content = RpbContent::with_value(b"hi\n");
    content.charset = Some(bytes_in(b"utf-8", Global).unwrap());
    content.last_mod = Some(1_400_000_000);
    content.last_mod_usecs = Some(7);
    content.deleted = Some(true);
    content
        .links
        .push(RpbLink::new(Some(&b"b2"[..]), Some(&b"k2"[..]), Some(&b"t"[..])));
    Object::from_wire(Global, &content).unwrap()
}

const EXPECTED: &[u8] = b"Bucket: \n\
Value: hi\\x0a\n\
Charset: utf-8\n\
Last Mod: 2014-05-13 16:53:20\n\
Last Mod uSecs: 7\n\
Deleted: true\n\
Link buffer: b2\n\
Link Key: k2\n\
Link Tag: t\n";

#[test]
fn full_rendering_matches_field_order() {
    let obj = sample();
    let mut buf = [SENTINEL; 512];
    let n = obj.print(&mut buf);
    assert_eq!(&buf[..n], EXPECTED);
    assert_eq!(buf[n], 0);
}

#[test]
fn every_buffer_length_is_respected() {
    let obj = sample();
    let full = EXPECTED.len();
    for len in 0..=full + 2 {
        let mut buf = vec![SENTINEL; len + 4];
        let n = obj.print(&mut buf[..len]);
        assert_eq!(n, full, "length {len}");
        let stored = full.min(len.saturating_sub(1));
        assert_eq!(&buf[..stored], &EXPECTED[..stored], "length {len}");
        if len > 0 {
            assert_eq!(buf[stored], 0, "terminator at length {len}");
        }
        assert!(buf[len..].iter().all(|b| *b == SENTINEL), "overrun at length {len}");
    }
}

#[test]
fn zero_length_buffer_reports_required_size() {
    assert_eq!(sample().print(&mut []), EXPECTED.len());
}

#[test]
fn pairs_print_key_and_present_value() {
    let pairs = pairs_from_wire(
        Global,
        &[RpbPair::new(b"color", Some(&b"blue"[..])), RpbPair::new(b"flag", None)],
    )
    .unwrap();
    let mut buf = [SENTINEL; 64];
    let n = print_pairs(pairs.as_slice(), &mut buf);
    assert_eq!(&buf[..n], b"key: color\nvalue: blue\nkey: flag\n");
}
