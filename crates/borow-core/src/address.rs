//! Display-only pseudo-addresses for concepts.
//!
//! FNV-1a over the UTF-16 code units of the identity. Identities made of
//! BMP characters therefore hash the same as their per-character encoding,
//! which keeps rendered addresses stable against existing golden output.

use serde::{Deserialize, Serialize};
use std::fmt;

const FNV_OFFSET_BASIS: u64 = 14_695_981_039_346_656_037;
const FNV_PRIME: u64 = 1_099_511_628_211;

/// Hash a concept identity into a pseudo-address. Pure and deterministic.
pub fn address_of(identity: &str) -> u64 {
    identity.encode_utf16().fold(FNV_OFFSET_BASIS, |hash, unit| {
        (hash ^ u64::from(unit)).wrapping_mul(FNV_PRIME)
    })
}

/// A concept's pseudo-address. Renders as `0x` followed by lowercase hex.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptAddress(u64);

impl ConceptAddress {
    pub fn of(identity: &str) -> Self {
        Self(address_of(identity))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<ConceptAddress> for u64 {
    fn from(address: ConceptAddress) -> Self {
        address.0
    }
}

impl fmt::Display for ConceptAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::LowerHex for ConceptAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_identity_is_offset_basis() {
        assert_eq!(address_of(""), 14695981039346656037);
    }

    #[test]
    fn test_single_byte_vector() {
        // Standard FNV-1a 64 reference vector for "a".
        assert_eq!(address_of("a"), 0xaf63dc4c8601ec8c);
    }
}
