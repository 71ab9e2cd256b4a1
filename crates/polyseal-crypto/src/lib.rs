//! # polyseal-crypto: Merkle Whitelist Commitments
//!
//! Builds the commitment that lets a proof attest "the recipient is on the
//! user's whitelist" without publishing the whitelist:
//!
//! - [`MerkleHasher`]: the leaf/node/padding hash contract. The tree must hash
//!   exactly the way the external circuit does, so the hasher is a type
//!   parameter rather than a hard-coded function.
//! - [`Sha256MerkleHasher`]: default domain-separated SHA-256 hasher.
//! - [`WhitelistTreeBuilder`]: canonicalizes, sorts and pads an address set,
//!   then builds every level of the tree.
//! - [`MerkleTree::prove_inclusion`] / [`verify_inclusion`]: membership paths.
//!
//! ## Crate Policy
//!
//! - Depends only on `polyseal-core` internally.
//! - Trees are rebuilt from the full set; there is no leaf-level mutation.

pub mod error;
pub mod hasher;
pub mod merkle;

pub use error::CryptoError;
pub use hasher::{Hash32, MerkleHasher, Sha256MerkleHasher};
pub use merkle::{verify_inclusion, InclusionProof, MerkleTree, PathStep, Side, WhitelistTreeBuilder};
