// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! CBOR encoding and decoding for wire-form content.
//!
//! Every message is a definite-length CBOR map keyed by the Riak protobuf
//! field number of each field. Absent optional fields are omitted, repeated
//! fields are definite arrays and are omitted when empty. Unknown keys are
//! skipped so newer senders stay readable; duplicate keys are rejected.

use alloc::format;
use core::convert::Infallible;

use allocator_api2::alloc::{Allocator, Global};
use allocator_api2::vec::Vec;
use minicbor::{Decoder, Encoder};

use crate::{Bytes, RpbContent, RpbLink, RpbPair};

/// Upper bound on the element count of any repeated field.
pub const MAX_ELEMENTS: usize = 65_536;

/// Upper bound on the number of map entries in a single message.
pub const MAX_FIELDS: u64 = 64;

/// Error produced while encoding into an in-memory buffer.
pub type EncodeError = minicbor::encode::Error<Infallible>;

/// `RpbContent` field numbers.
mod content_field {
    pub const VALUE: u32 = 1;
    pub const CONTENT_TYPE: u32 = 2;
    pub const CHARSET: u32 = 3;
    pub const CONTENT_ENCODING: u32 = 4;
    pub const VTAG: u32 = 5;
    pub const LINKS: u32 = 6;
    pub const LAST_MOD: u32 = 7;
    pub const LAST_MOD_USECS: u32 = 8;
    pub const USERMETA: u32 = 9;
    pub const INDEXES: u32 = 10;
    pub const DELETED: u32 = 11;
}

/// `RpbPair` field numbers.
mod pair_field {
    pub const KEY: u32 = 1;
    pub const VALUE: u32 = 2;
}

/// `RpbLink` field numbers.
mod link_field {
    pub const BUCKET: u32 = 1;
    pub const KEY: u32 = 2;
    pub const TAG: u32 = 3;
}

// ============================================================================
// Decoding helpers
// ============================================================================

fn decode_map_len(d: &mut Decoder<'_>, what: &str) -> Result<u64, minicbor::decode::Error> {
    let len = d.map()?.ok_or_else(|| {
        minicbor::decode::Error::message(format!("expected definite map for {what}"))
    })?;
    if len > MAX_FIELDS {
        return Err(minicbor::decode::Error::message(format!(
            "{what} has too many fields: {len}"
        )));
    }
    Ok(len)
}

fn out_of_memory(what: &str) -> minicbor::decode::Error {
    minicbor::decode::Error::message(format!("out of memory decoding {what}"))
}

fn decode_owned_bytes<A: Allocator>(
    d: &mut Decoder<'_>,
    alloc: A,
) -> Result<Bytes<A>, minicbor::decode::Error> {
    crate::bytes_in(d.bytes()?, alloc).map_err(|_| out_of_memory("bytes"))
}

/// Store a decoded field, rejecting a second occurrence of the same key.
fn set_once<T>(
    slot: &mut Option<T>,
    value: T,
    what: &str,
    field: u32,
) -> Result<(), minicbor::decode::Error> {
    if slot.is_some() {
        return Err(minicbor::decode::Error::message(format!(
            "duplicate field {field} in {what}"
        )));
    }
    *slot = Some(value);
    Ok(())
}

fn decode_array_of<T, A: Allocator>(
    d: &mut Decoder<'_>,
    what: &str,
    alloc: A,
    mut item: impl FnMut(&mut Decoder<'_>) -> Result<T, minicbor::decode::Error>,
) -> Result<Vec<T, A>, minicbor::decode::Error> {
    let len = d.array()?.ok_or_else(|| {
        minicbor::decode::Error::message(format!("expected definite array for {what}"))
    })?;
    let len = usize::try_from(len)
        .ok()
        .filter(|len| *len <= MAX_ELEMENTS)
        .ok_or_else(|| minicbor::decode::Error::message(format!("too many {what}")))?;
    // every element occupies at least one input byte
    let remaining = d.input().len().saturating_sub(d.position());
    let mut items = Vec::new_in(alloc);
    items
        .try_reserve_exact(len.min(remaining))
        .map_err(|_| out_of_memory(what))?;
    for _ in 0..len {
        let value = item(d)?;
        items.try_reserve(1).map_err(|_| out_of_memory(what))?;
        items.push(value);
    }
    Ok(items)
}

// ============================================================================
// RpbPair
// ============================================================================

fn encode_pair_inner<W: minicbor::encode::Write, A: Allocator>(
    e: &mut Encoder<W>,
    pair: &RpbPair<A>,
) -> Result<(), minicbor::encode::Error<W::Error>> {
    e.map(if pair.value.is_some() { 2 } else { 1 })?;
    e.u32(pair_field::KEY)?.bytes(&pair.key)?;
    if let Some(value) = &pair.value {
        e.u32(pair_field::VALUE)?.bytes(value)?;
    }
    Ok(())
}

fn decode_pair_inner<A: Allocator + Clone>(
    d: &mut Decoder<'_>,
    alloc: &A,
) -> Result<RpbPair<A>, minicbor::decode::Error> {
    let len = decode_map_len(d, "RpbPair")?;
    let mut key = None;
    let mut value = None;
    for _ in 0..len {
        match d.u32()? {
            pair_field::KEY => set_once(&mut key, decode_owned_bytes(d, alloc.clone())?, "RpbPair", 1)?,
            pair_field::VALUE => {
                set_once(&mut value, decode_owned_bytes(d, alloc.clone())?, "RpbPair", 2)?;
            }
            _ => d.skip()?,
        }
    }
    let key = key.ok_or_else(|| minicbor::decode::Error::message("RpbPair missing key"))?;
    Ok(RpbPair { key, value })
}

// ============================================================================
// RpbLink
// ============================================================================

fn encode_link_inner<W: minicbor::encode::Write, A: Allocator>(
    e: &mut Encoder<W>,
    link: &RpbLink<A>,
) -> Result<(), minicbor::encode::Error<W::Error>> {
    let fields = [
        (link_field::BUCKET, &link.bucket),
        (link_field::KEY, &link.key),
        (link_field::TAG, &link.tag),
    ];
    let present = fields.iter().filter(|(_, v)| v.is_some()).count();
    e.map(present as u64)?;
    for (field, value) in fields {
        if let Some(bytes) = value {
            e.u32(field)?.bytes(bytes)?;
        }
    }
    Ok(())
}

fn decode_link_inner<A: Allocator + Clone>(
    d: &mut Decoder<'_>,
    alloc: &A,
) -> Result<RpbLink<A>, minicbor::decode::Error> {
    const WHAT: &str = "RpbLink";
    let len = decode_map_len(d, WHAT)?;
    let mut link = RpbLink::empty();
    for _ in 0..len {
        let field = d.u32()?;
        let slot = match field {
            link_field::BUCKET => &mut link.bucket,
            link_field::KEY => &mut link.key,
            link_field::TAG => &mut link.tag,
            _ => {
                d.skip()?;
                continue;
            }
        };
        set_once(slot, decode_owned_bytes(d, alloc.clone())?, WHAT, field)?;
    }
    Ok(link)
}

// ============================================================================
// RpbContent
// ============================================================================

fn content_field_count<A: Allocator>(content: &RpbContent<A>) -> u64 {
    let optional_bytes = [
        &content.content_type,
        &content.charset,
        &content.content_encoding,
        &content.vtag,
    ]
    .iter()
    .filter(|v| v.is_some())
    .count();
    let scalars = [content.last_mod.is_some(), content.last_mod_usecs.is_some(), content.deleted.is_some()]
        .iter()
        .filter(|present| **present)
        .count();
    let repeated = [
        content.links.is_empty(),
        content.usermeta.is_empty(),
        content.indexes.is_empty(),
    ]
    .iter()
    .filter(|empty| !**empty)
    .count();
    (1 + optional_bytes + scalars + repeated) as u64
}

fn encode_content_inner<W: minicbor::encode::Write, A: Allocator>(
    e: &mut Encoder<W>,
    content: &RpbContent<A>,
) -> Result<(), minicbor::encode::Error<W::Error>> {
    e.map(content_field_count(content))?;
    e.u32(content_field::VALUE)?.bytes(&content.value)?;
    if let Some(v) = &content.content_type {
        e.u32(content_field::CONTENT_TYPE)?.bytes(v)?;
    }
    if let Some(v) = &content.charset {
        e.u32(content_field::CHARSET)?.bytes(v)?;
    }
    if let Some(v) = &content.content_encoding {
        e.u32(content_field::CONTENT_ENCODING)?.bytes(v)?;
    }
    if let Some(v) = &content.vtag {
        e.u32(content_field::VTAG)?.bytes(v)?;
    }
    if !content.links.is_empty() {
        e.u32(content_field::LINKS)?.array(content.links.len() as u64)?;
        for link in content.links.iter() {
            encode_link_inner(e, link)?;
        }
    }
    if let Some(v) = content.last_mod {
        e.u32(content_field::LAST_MOD)?.u32(v)?;
    }
    if let Some(v) = content.last_mod_usecs {
        e.u32(content_field::LAST_MOD_USECS)?.u32(v)?;
    }
    if !content.usermeta.is_empty() {
        e.u32(content_field::USERMETA)?.array(content.usermeta.len() as u64)?;
        for pair in content.usermeta.iter() {
            encode_pair_inner(e, pair)?;
        }
    }
    if !content.indexes.is_empty() {
        e.u32(content_field::INDEXES)?.array(content.indexes.len() as u64)?;
        for pair in content.indexes.iter() {
            encode_pair_inner(e, pair)?;
        }
    }
    if let Some(v) = content.deleted {
        e.u32(content_field::DELETED)?.bool(v)?;
    }
    Ok(())
}

fn decode_content_inner<A: Allocator + Clone>(
    d: &mut Decoder<'_>,
    alloc: &A,
) -> Result<RpbContent<A>, minicbor::decode::Error> {
    const WHAT: &str = "RpbContent";
    let len = decode_map_len(d, WHAT)?;
    let mut value = None;
    let mut content_type = None;
    let mut charset = None;
    let mut content_encoding = None;
    let mut vtag = None;
    let mut links = None;
    let mut last_mod = None;
    let mut last_mod_usecs = None;
    let mut usermeta = None;
    let mut indexes = None;
    let mut deleted = None;
    for _ in 0..len {
        let field = d.u32()?;
        match field {
            content_field::VALUE => set_once(&mut value, decode_owned_bytes(d, alloc.clone())?, WHAT, field)?,
            content_field::CONTENT_TYPE => {
                set_once(&mut content_type, decode_owned_bytes(d, alloc.clone())?, WHAT, field)?;
            }
            content_field::CHARSET => {
                set_once(&mut charset, decode_owned_bytes(d, alloc.clone())?, WHAT, field)?;
            }
            content_field::CONTENT_ENCODING => {
                set_once(&mut content_encoding, decode_owned_bytes(d, alloc.clone())?, WHAT, field)?;
            }
            content_field::VTAG => set_once(&mut vtag, decode_owned_bytes(d, alloc.clone())?, WHAT, field)?,
            content_field::LINKS => {
                let items = decode_array_of(d, "links", alloc.clone(), |d| decode_link_inner(d, alloc))?;
                set_once(&mut links, items, WHAT, field)?;
            }
            content_field::LAST_MOD => set_once(&mut last_mod, d.u32()?, WHAT, field)?,
            content_field::LAST_MOD_USECS => set_once(&mut last_mod_usecs, d.u32()?, WHAT, field)?,
            content_field::USERMETA => {
                let items = decode_array_of(d, "usermeta", alloc.clone(), |d| decode_pair_inner(d, alloc))?;
                set_once(&mut usermeta, items, WHAT, field)?;
            }
            content_field::INDEXES => {
                let items = decode_array_of(d, "indexes", alloc.clone(), |d| decode_pair_inner(d, alloc))?;
                set_once(&mut indexes, items, WHAT, field)?;
            }
            content_field::DELETED => set_once(&mut deleted, d.bool()?, WHAT, field)?,
            _ => d.skip()?,
        }
    }
    let value = value.ok_or_else(|| minicbor::decode::Error::message("RpbContent missing value"))?;
    let mut content = RpbContent::new_in(value, alloc.clone());
    content.content_type = content_type;
    content.charset = charset;
    content.content_encoding = content_encoding;
    content.vtag = vtag;
    content.last_mod = last_mod;
    content.last_mod_usecs = last_mod_usecs;
    content.deleted = deleted;
    if let Some(links) = links {
        content.links = links;
    }
    if let Some(usermeta) = usermeta {
        content.usermeta = usermeta;
    }
    if let Some(indexes) = indexes {
        content.indexes = indexes;
    }
    Ok(content)
}

// ============================================================================
// Public encode/decode functions
// ============================================================================

fn finish<T>(decoder: &Decoder<'_>, bytes: &[u8], value: T, what: &str) -> Result<T, minicbor::decode::Error> {
    if decoder.position() < bytes.len() {
        return Err(minicbor::decode::Error::message(format!(
            "trailing bytes in {what}"
        )));
    }
    Ok(value)
}

/// Encode an RpbContent to CBOR bytes.
pub fn encode_content<A: Allocator>(content: &RpbContent<A>) -> Result<alloc::vec::Vec<u8>, EncodeError> {
    let mut buf = alloc::vec::Vec::new();
    let mut encoder = Encoder::new(&mut buf);
    encode_content_inner(&mut encoder, content)?;
    Ok(buf)
}

/// Decode an RpbContent from CBOR bytes onto the global heap.
pub fn decode_content(bytes: &[u8]) -> Result<RpbContent, minicbor::decode::Error> {
    decode_content_in(bytes, Global)
}

/// Decode an RpbContent from CBOR bytes into storage obtained from `alloc`.
///
/// A refused allocation is reported as a decode error.
pub fn decode_content_in<A: Allocator + Clone>(
    bytes: &[u8],
    alloc: A,
) -> Result<RpbContent<A>, minicbor::decode::Error> {
    let mut decoder = Decoder::new(bytes);
    let content = decode_content_inner(&mut decoder, &alloc)?;
    finish(&decoder, bytes, content, "RpbContent")
}

/// Encode an RpbPair to CBOR bytes.
pub fn encode_pair<A: Allocator>(pair: &RpbPair<A>) -> Result<alloc::vec::Vec<u8>, EncodeError> {
    let mut buf = alloc::vec::Vec::new();
    let mut encoder = Encoder::new(&mut buf);
    encode_pair_inner(&mut encoder, pair)?;
    Ok(buf)
}

/// Decode an RpbPair from CBOR bytes.
pub fn decode_pair(bytes: &[u8]) -> Result<RpbPair, minicbor::decode::Error> {
    let mut decoder = Decoder::new(bytes);
    let pair = decode_pair_inner(&mut decoder, &Global)?;
    finish(&decoder, bytes, pair, "RpbPair")
}

/// Encode an RpbLink to CBOR bytes.
pub fn encode_link<A: Allocator>(link: &RpbLink<A>) -> Result<alloc::vec::Vec<u8>, EncodeError> {
    let mut buf = alloc::vec::Vec::new();
    let mut encoder = Encoder::new(&mut buf);
    encode_link_inner(&mut encoder, link)?;
    Ok(buf)
}

/// Decode an RpbLink from CBOR bytes.
pub fn decode_link(bytes: &[u8]) -> Result<RpbLink, minicbor::decode::Error> {
    let mut decoder = Decoder::new(bytes);
    let link = decode_link_inner(&mut decoder, &Global)?;
    finish(&decoder, bytes, link, "RpbLink")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bumpalo::Bump;

    fn full_content() -> RpbContent {
        let mut content = RpbContent::with_value(b"hello");
        content.content_type = Some(crate::bytes_in(b"text/plain", Global).unwrap());
        content.charset = Some(crate::bytes_in(b"utf-8", Global).unwrap());
        content.content_encoding = Some(crate::bytes_in(b"gzip", Global).unwrap());
        content.vtag = Some(crate::bytes_in(b"5a2QQs3KWw", Global).unwrap());
        content
            .links
            .push(RpbLink::new(Some(&b"people"[..]), Some(&b"bob"[..]), Some(&b"friend"[..])));
        content.last_mod = Some(1_400_000_000);
        content.last_mod_usecs = Some(123_456);
        content.usermeta.push(RpbPair::new(b"color", Some(&b"blue"[..])));
        content.indexes.push(RpbPair::new(b"age_int", Some(&b"42"[..])));
        content.indexes.push(RpbPair::new(b"flag_bin", None));
        content.deleted = Some(false);
        content
    }

    #[test]
    fn test_content_roundtrip_all_fields() {
        let content = full_content();
        let bytes = encode_content(&content).unwrap();
        assert_eq!(decode_content(&bytes).unwrap(), content);
    }

    #[test]
    fn test_decode_into_arena() {
        let bytes = encode_content(&full_content()).unwrap();
        let arena = Bump::new();
        let decoded = decode_content_in(&bytes, &arena).unwrap();
        assert_eq!(decoded, full_content());
        assert!(arena.allocated_bytes() > 0);
    }

    #[test]
    fn test_minimal_content_golden_bytes() {
        // {1: h'76'}
        let bytes = encode_content(&RpbContent::with_value(b"v")).unwrap();
        assert_eq!(hex::encode(&bytes), "a1014176");
    }

    #[test]
    fn test_pair_without_value_omits_field() {
        let pair = RpbPair::new(b"k", None);
        let bytes = encode_pair(&pair).unwrap();
        // {1: h'6b'}
        assert_eq!(hex::encode(&bytes), "a101416b");
        assert_eq!(decode_pair(&bytes).unwrap(), pair);
    }

    #[test]
    fn test_link_fields_independent() {
        let link = RpbLink::new(None, Some(&b"k"[..]), None);
        let bytes = encode_link(&link).unwrap();
        // {2: h'6b'}
        assert_eq!(hex::encode(&bytes), "a102416b");
        let decoded = decode_link(&bytes).unwrap();
        assert!(decoded.bucket.is_none());
        assert!(decoded.tag.is_none());
        assert_eq!(decoded, link);
    }

    #[test]
    fn test_empty_bytes_are_not_absent() {
        let mut content = RpbContent::with_value(b"");
        content.charset = Some(Bytes::new());
        let decoded = decode_content(&encode_content(&content).unwrap()).unwrap();
        assert_eq!(decoded.charset.as_deref(), Some(&b""[..]));
        assert!(decoded.content_type.is_none());
    }

    #[test]
    fn test_missing_value_rejected() {
        // {2: h'74'}
        let bytes = hex::decode("a1024174").unwrap();
        assert!(decode_content(&bytes).is_err());
    }

    #[test]
    fn test_pair_missing_key_rejected() {
        // {2: h'76'}
        let bytes = hex::decode("a1024176").unwrap();
        assert!(decode_pair(&bytes).is_err());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        // {1: h'61', 1: h'62'}
        let bytes = hex::decode("a2014161014162").unwrap();
        assert!(decode_content(&bytes).is_err());
    }

    #[test]
    fn test_unknown_field_skipped() {
        // {1: h'76', 99: "x"}
        let bytes = hex::decode("a201417618636178").unwrap();
        let decoded = decode_content(&bytes).unwrap();
        assert_eq!(decoded, RpbContent::with_value(b"v"));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = encode_content(&RpbContent::with_value(b"v")).unwrap();
        bytes.push(0x00);
        assert!(decode_content(&bytes).is_err());
    }

    #[test]
    fn test_indefinite_map_rejected() {
        // {_ 1: h'76'}
        let bytes = hex::decode("bf014176ff").unwrap();
        assert!(decode_content(&bytes).is_err());
    }

    #[test]
    fn test_oversized_array_rejected() {
        // {1: h'76', 9: array(2^32 - 1)}
        let bytes = hex::decode("a2014176099affffffff").unwrap();
        assert!(decode_content(&bytes).is_err());
    }

    #[test]
    fn test_short_input_bounds_array_reservation() {
        // {1: h'76', 9: array(65536)} with no elements following
        let bytes = hex::decode("a2014176099a00010000").unwrap();
        let arena = Bump::new();
        assert!(decode_content_in(&bytes, &arena).is_err());
        // nothing close to 65536 pair slots was reserved up front
        assert!(arena.allocated_bytes() < 65_536);
    }
}
