// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Allocator configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::allocator::TrackingAllocator;

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Limits and fault injection for a [`TrackingAllocator`].
///
/// Every field is optional; an empty config builds an unlimited tracker.
///
/// ```json
/// { "max_bytes": 1048576, "max_allocations": 4096, "fail_at": null }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllocatorConfig {
    /// Bound on live bytes.
    pub max_bytes: Option<usize>,
    /// Bound on live allocations.
    pub max_allocations: Option<usize>,
    /// Sequence number of the single request to refuse.
    pub fail_at: Option<usize>,
}

impl AllocatorConfig {
    /// Parse a config from a JSON blob. An empty blob is the default config.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize the config as pretty JSON.
    pub fn to_json(&self) -> Result<Vec<u8>, ConfigError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Build a tracker with these limits.
    pub fn build(&self) -> TrackingAllocator {
        TrackingAllocator::new()
            .max_bytes(self.max_bytes)
            .max_allocations(self.max_allocations)
            .fail_at(self.fail_at)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::binary::Binary;

    #[test]
    fn empty_blob_is_default() {
        assert_eq!(AllocatorConfig::from_json(b"").unwrap(), AllocatorConfig::default());
        assert_eq!(AllocatorConfig::from_json(b"{}").unwrap(), AllocatorConfig::default());
    }

    #[test]
    fn limits_apply_to_built_tracker() {
        let cfg = AllocatorConfig::from_json(br#"{"max_bytes": 8}"#).unwrap();
        let alloc = cfg.build();
        assert!(Binary::copy_from(&alloc, &[0u8; 9]).is_err());
        let fits = Binary::copy_from(&alloc, &[0u8; 8]).unwrap();
        assert_eq!(alloc.live_bytes(), 8);
        drop(fits);
        assert!(alloc.is_balanced());
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(AllocatorConfig::from_json(br#"{"max_byte": 8}"#).is_err());
    }

    #[test]
    fn json_round_trip() {
        let cfg = AllocatorConfig {
            max_bytes: Some(1 << 20),
            max_allocations: None,
            fail_at: Some(3),
        };
        let back = AllocatorConfig::from_json(&cfg.to_json().unwrap()).unwrap();
        assert_eq!(back, cfg);
    }
}
