//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier that crosses a crate boundary. An
//! [`AdapterId`] cannot be passed where an [`AssetId`] is expected, and an
//! [`Address`] is always in canonical form once constructed.
//!
//! ## Address canonical form
//!
//! `0x` followed by 40 lowercase hex characters. Because the encoding is fixed
//! width and lowercase, lexicographic order of canonical strings equals the
//! byte order of the underlying 20 bytes; the whitelist builder relies on this
//! when it sorts leaves.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Length in bytes of an account address.
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte account address in canonical lowercase form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse and canonicalize an address.
    ///
    /// Accepts surrounding whitespace, any letter case, and an optional `0x`
    /// prefix.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let invalid = |reason: &str| ValidationError::InvalidAddress {
            value: input.to_string(),
            reason: reason.to_string(),
        };
        if body.len() != ADDRESS_LEN * 2 {
            return Err(invalid("expected 40 hex characters"));
        }
        if !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid("contains non-hex characters"));
        }
        Ok(Self(format!("0x{}", body.to_ascii_lowercase())))
    }

    /// Build an address from raw bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 20 raw address bytes.
    pub fn to_bytes(&self) -> [u8; ADDRESS_LEN] {
        let mut out = [0u8; ADDRESS_LEN];
        // Canonical form is validated at construction.
        if let Ok(raw) = hex::decode(&self.0[2..]) {
            out.copy_from_slice(&raw);
        }
        out
    }
}

impl std::str::FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $variant:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Construct from a non-empty string; surrounding whitespace is trimmed.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::$variant(value));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                v.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of the adapter that produced a transaction (e.g. `erc20-transfer`).
    AdapterId,
    InvalidAdapterId
);
string_id!(
    /// Asset identifier, typically a token contract address or a native symbol.
    AssetId,
    InvalidAssetId
);
string_id!(
    /// Target chain identifier (e.g. `eip155:1`).
    ChainId,
    InvalidChainId
);
