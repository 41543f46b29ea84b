// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Riak object model and wire adapter.
//!
//! `riak-object` maps between the in-memory object model ([`Object`],
//! [`Pair`], [`Link`]) and the wire-form content types of `riak-pb`. Every
//! byte of dynamic memory the layer uses comes from an [`Allocator`] passed
//! in by the caller, never from the global heap behind its back, so arenas,
//! pools and accounting allocators plug in without touching the conversion
//! code. The trait is `allocator-api2`'s; `&bumpalo::Bump`, [`Global`] and
//! `&TrackingAllocator` all qualify.
//!
//! # Presence
//!
//! Optional fields are `Option`s. An absent field is never copied, never
//! defaulted to empty bytes, and never shows up on the wire. Presence and
//! emptiness are independent: an empty binary is a present value.
//!
//! # Ownership Invariants
//!
//! - An object exclusively owns every binary, pair and link reachable from
//!   it. There are no shared or back references.
//! - Storage is returned to the allocator that produced it when its owner is
//!   dropped: binaries first, then collection elements, then slot arrays,
//!   then the entity itself.
//! - An empty collection holds no allocation.
//! - Outbound wire values own the copies made for them, stored in the
//!   allocator given to `to_wire`, and are released independently of their
//!   source object.
//! - A conversion that fails has returned everything it allocated before
//!   the error reaches the caller.
//!
//! # Example
//!
//! ```
//! use riak_object::{Binary, Object, TrackingAllocator};
//!
//! # fn main() -> Result<(), riak_object::ObjectError> {
//! let alloc = TrackingAllocator::new();
//! let mut obj = Object::new(&alloc)?;
//! let _ = obj.set_bucket(Binary::copy_from(&alloc, b"users")?);
//! let _ = obj.set_value(Binary::copy_from(&alloc, b"{}")?);
//!
//! let wire = obj.to_wire(&alloc)?;
//! let back = Object::from_wire(&alloc, &wire)?;
//! assert!(back.content_eq(&obj));
//!
//! drop((back, wire, obj));
//! assert!(alloc.is_balanced());
//! # Ok(())
//! # }
//! ```

mod allocator;
mod binary;
mod collection;
mod config;
mod error;
mod lifecycle;
mod link;
mod object;
mod pair;
mod print;

pub use allocator::{AllocError, Allocator, Global, Layout, TrackingAllocator};
pub use binary::Binary;
pub use collection::Collection;
pub use config::{AllocatorConfig, ConfigError};
pub use error::{ObjectError, Result};
pub use lifecycle::{
    free_binary, free_links, free_object, free_object_array, free_pairs, free_wire_content,
    free_wire_links, free_wire_pairs,
};
pub use link::{links_from_wire, links_to_wire, Link};
pub use object::Object;
pub use pair::{pairs_from_wire, pairs_to_wire, Pair};
pub use print::{print_pairs, BoundedWriter, SCRATCH_LEN};

pub use riak_pb;
