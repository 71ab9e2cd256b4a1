//! # Error Types
//!
//! Errors raised while constructing domain primitives. Policy, proof and
//! serving errors live in their own crates and wrap these where needed.

use thiserror::Error;

/// A domain primitive failed validation at construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Not a 20-byte hex address.
    #[error("invalid address {value:?}: {reason}")]
    InvalidAddress { value: String, reason: String },

    /// Not a non-negative integer representable in 128 bits.
    #[error("invalid amount {value:?}: {reason}")]
    InvalidAmount { value: String, reason: String },

    #[error("invalid adapter id: {0:?}")]
    InvalidAdapterId(String),

    #[error("invalid asset id: {0:?}")]
    InvalidAssetId(String),

    #[error("invalid chain id: {0:?}")]
    InvalidChainId(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Rule kind tag is not one of the registered kinds.
    #[error("unknown rule kind {0:?}")]
    UnknownRuleKind(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations; use string or integer for amount: {0}")]
    FloatRejected(f64),

    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
