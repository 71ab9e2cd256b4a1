//! # Merkle Hashing
//!
//! Leaf, node and padding hashes for the whitelist tree.
//!
//! The default [`Sha256MerkleHasher`] uses domain separation so that a leaf
//! can never be confused with an internal node:
//!
//! - Leaf: `SHA256(0x00 || address_bytes[20])`
//! - Node: `SHA256(0x01 || left || right)`
//! - Padding leaf: 32 zero bytes, which is not the image of any address.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use polyseal_core::Address;

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// A 32-byte hash value, serialized as lowercase hex with a `0x` prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    pub const ZERO: Hash32 = Hash32([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse 64 hex characters, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut out = [0u8; 32];
        hex::decode_to_slice(s.trim().trim_start_matches("0x"), &mut out)?;
        Ok(Self(out))
    }
}

impl std::fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash32({})", self.to_hex())
    }
}

impl std::fmt::Display for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Hash32 {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash32 {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Hash32::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// The hash contract of a whitelist tree.
///
/// Implementations must be deterministic and must match the external circuit
/// bit for bit.
pub trait MerkleHasher: Send + Sync {
    /// Stable identifier, recorded alongside roots.
    fn id(&self) -> &'static str;

    fn hash_leaf(&self, address: &Address) -> Hash32;

    fn hash_node(&self, left: &Hash32, right: &Hash32) -> Hash32;

    /// Value used for leaves that pad the tree to a power of two.
    fn padding_leaf(&self) -> Hash32;
}

impl<T: MerkleHasher + ?Sized> MerkleHasher for std::sync::Arc<T> {
    fn id(&self) -> &'static str {
        (**self).id()
    }

    fn hash_leaf(&self, address: &Address) -> Hash32 {
        (**self).hash_leaf(address)
    }

    fn hash_node(&self, left: &Hash32, right: &Hash32) -> Hash32 {
        (**self).hash_node(left, right)
    }

    fn padding_leaf(&self) -> Hash32 {
        (**self).padding_leaf()
    }
}

/// Domain-separated SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256MerkleHasher;

impl MerkleHasher for Sha256MerkleHasher {
    fn id(&self) -> &'static str {
        "sha256-ds-v1"
    }

    fn hash_leaf(&self, address: &Address) -> Hash32 {
        let mut h = Sha256::new();
        h.update([LEAF_PREFIX]);
        h.update(address.to_bytes());
        finish(h)
    }

    fn hash_node(&self, left: &Hash32, right: &Hash32) -> Hash32 {
        let mut h = Sha256::new();
        h.update([NODE_PREFIX]);
        h.update(left.0);
        h.update(right.0);
        finish(h)
    }

    fn padding_leaf(&self) -> Hash32 {
        Hash32::ZERO
    }
}

fn finish(h: Sha256) -> Hash32 {
    let mut out = [0u8; 32];
    out.copy_from_slice(&h.finalize());
    Hash32(out)
}
