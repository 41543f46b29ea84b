// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wire-form content types for Riak objects.
//!
//! This crate provides:
//! - [`RpbContent`], [`RpbPair`] and [`RpbLink`], the structured wire form of
//!   a stored object exchanged with the remote store
//! - a CBOR reference codec for those types
//!
//! # Design
//!
//! The types carry no allocation policy and no conversion logic. The object
//! layer (`riak-object`) owns conversion; this crate only describes the shape
//! of the message and how it is laid out on the wire.
//!
//! Each type is generic over the `allocator-api2` [`Allocator`] its storage
//! lives in, defaulting to the global heap. [`decode_content_in`] decodes
//! straight into a caller-supplied allocator.
//!
//! Optional fields are `Option`s. An absent field is omitted from the
//! encoding entirely, it is never encoded as empty bytes.

#![cfg_attr(not(feature = "std"), no_std)]
extern crate alloc;

mod codec;
mod types;

pub use codec::*;
pub use types::{bytes_in, Bytes, RpbContent, RpbLink, RpbPair};

pub use allocator_api2;
pub use allocator_api2::alloc::{AllocError, Allocator, Global};
