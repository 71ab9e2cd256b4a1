//! # polyseal-core: Foundational Types for Polyseal
//!
//! Every other crate in the workspace depends on `polyseal-core`; it depends on
//! nothing internal. It defines the primitives that the policy compiler, the
//! whitelist commitment builder, and the proof pipeline agree on.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** [`Address`], [`AdapterId`],
//!    [`AssetId`], [`ChainId`] validate at construction. No bare strings for
//!    identifiers.
//!
//! 2. **Integer amounts only.** [`Amount`] is a `u128` in native precision and
//!    serializes as a decimal string. Floats are rejected at every boundary.
//!
//! 3. **Single [`RuleKind`] enum.** One closed set of rule kinds with a fixed
//!    priority order, matched exhaustively by the registry and the compiler.
//!
//! 4. **[`CanonicalBytes`] is the sole path to digest computation.** Policy
//!    commitments and compiled-policy digests flow through
//!    `CanonicalBytes::new()` and [`sha256_digest()`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `polyseal-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod adapter;
pub mod amount;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod rule_kind;
pub mod temporal;
pub mod transaction;

// Re-export primary types for ergonomic imports.
pub use adapter::{Adapter, AdapterError, AdapterMetadata};
pub use amount::Amount;
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm, Sha256Accumulator};
pub use error::{CanonicalizationError, ValidationError};
pub use identity::{AdapterId, Address, AssetId, ChainId};
pub use rule_kind::RuleKind;
pub use temporal::Timestamp;
pub use transaction::ProposedTransaction;
