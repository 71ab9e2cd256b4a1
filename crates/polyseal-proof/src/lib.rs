//! # polyseal-proof: Proof Pipeline
//!
//! Consumes a prepared [`polyseal_policy::PolicyConfig`] and produces a proof
//! that the proposed transaction complies with it:
//!
//! - [`CompiledCircuit`]: the external circuit artifact, pinned by digest.
//! - [`build_witness`]: bit-exact ABI v1 slot layout ([`Witness`]).
//! - [`ProvingBackend`] / [`BackendFactory`]: the external prover contract.
//! - [`MockBackend`]: deterministic SHA-256 stand-in that still enforces the
//!   circuit's constraints.
//! - [`ProofPolicy`]: production mode refuses mock proofs.
//! - [`ProofService`]: one serialized prover per process, timeouts, and
//!   discard-and-reinitialize on retryable failures.
//!
//! ## Crate Policy
//!
//! - Fatal errors (ABI mismatch, unsatisfied constraints, policy rejection)
//!   are never retried. [`ProofServiceError::is_retryable`] is the single
//!   source of that distinction.

pub mod backend;
pub mod circuit;
pub mod error;
pub mod field;
pub mod mock;
pub mod policy;
pub mod request;
pub mod service;
pub mod witness;

pub use backend::{BackendFactory, BackendKind, ProvingBackend};
pub use circuit::CompiledCircuit;
pub use error::{BackendError, CircuitError, ProofServiceError, WitnessError};
pub use field::FieldElement;
pub use mock::MockBackend;
pub use policy::{PolicyError, PolicyMode, ProofPolicy};
pub use request::{ProofRequest, ProofResult};
pub use service::{ProofService, ProofServiceConfig, DEFAULT_PROVE_TIMEOUT};
pub use witness::{build_witness, policy_commitment, Witness, ABI_VERSION, MAX_PATH_DEPTH};
