//! # Field Elements
//!
//! Every witness slot is a 32-byte big-endian word. Integers are
//! right-aligned, addresses occupy the low 20 bytes, and digests that must
//! fit a ~254-bit prime field have their top byte cleared.

use serde::{Deserialize, Serialize};

use polyseal_core::digest::hex_bytes32;
use polyseal_core::{Address, Amount, Timestamp};
use polyseal_crypto::Hash32;

/// One 32-byte big-endian witness word.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldElement(#[serde(with = "hex_bytes32")] pub [u8; 32]);

impl FieldElement {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_u64(value: u64) -> Self {
        let mut out = [0u8; 32];
        out[24..].copy_from_slice(&value.to_be_bytes());
        Self(out)
    }

    pub fn from_u128(value: u128) -> Self {
        let mut out = [0u8; 32];
        out[16..].copy_from_slice(&value.to_be_bytes());
        Self(out)
    }

    pub fn from_bool(value: bool) -> Self {
        Self::from_u64(u64::from(value))
    }

    pub fn from_amount(amount: Amount) -> Self {
        Self(amount.to_be_bytes32())
    }

    pub fn from_timestamp(ts: &Timestamp) -> Self {
        Self::from_u64(ts.unix_seconds())
    }

    pub fn from_address(address: &Address) -> Self {
        let mut out = [0u8; 32];
        out[12..].copy_from_slice(&address.to_bytes());
        Self(out)
    }

    /// A full-width hash, unchanged.
    pub fn from_hash(hash: &Hash32) -> Self {
        Self(hash.0)
    }

    /// A digest truncated to 248 bits so it is below any ~254-bit modulus.
    pub fn from_digest_truncated(mut bytes: [u8; 32]) -> Self {
        bytes[0] = 0;
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The low 64 bits, if the upper 24 bytes are zero.
    pub fn to_u64(&self) -> Option<u64> {
        if self.0[..24].iter().any(|b| *b != 0) {
            return None;
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.0[24..]);
        Some(u64::from_be_bytes(buf))
    }

    pub fn to_u128(&self) -> Option<u128> {
        if self.0[..16].iter().any(|b| *b != 0) {
            return None;
        }
        let mut buf = [0u8; 16];
        buf.copy_from_slice(&self.0[16..]);
        Some(u128::from_be_bytes(buf))
    }

    /// The low 20 bytes as an address, if the upper 12 are zero.
    pub fn to_address(&self) -> Option<Address> {
        if self.0[..12].iter().any(|b| *b != 0) {
            return None;
        }
        let mut buf = [0u8; 20];
        buf.copy_from_slice(&self.0[12..]);
        Some(Address::from_bytes(buf))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FieldElement(0x{})", self.to_hex())
    }
}
