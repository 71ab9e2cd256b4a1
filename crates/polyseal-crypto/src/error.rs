use thiserror::Error;

use polyseal_core::Address;

/// Errors from whitelist tree construction and proof generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// A tree needs at least one real leaf.
    #[error("cannot build a whitelist tree from an empty address set")]
    EmptyLeafSet,

    /// The queried address is not a leaf of the tree.
    #[error("address {0} is not in the whitelist tree")]
    NotFound(Address),

    #[error("whitelist of {0} addresses exceeds the maximum tree size")]
    TooManyLeaves(usize),
}
