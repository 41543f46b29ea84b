// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error type for object construction and conversion.

use thiserror::Error;

/// Errors produced by the object layer.
///
/// Allocation refusal is the only failure mode. It is always fatal to the
/// enclosing operation, and by the time it reaches the caller every
/// allocation made earlier in that operation has been released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ObjectError {
    /// The allocator refused a request.
    #[error("[RIAK_OUT_OF_MEMORY] allocator refused a request for {requested} bytes")]
    OutOfMemory {
        /// Size of the refused request in bytes.
        requested: usize,
    },
}

/// Result alias for object-layer operations.
pub type Result<T, E = ObjectError> = core::result::Result<T, E>;
