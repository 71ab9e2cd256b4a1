//! # Proof Pipeline Errors
//!
//! Every failure on the proof path is either *fatal* or *retryable*:
//!
//! - Fatal: the witness does not fit the circuit ABI, the circuit artifact is
//!   unusable, the witness violates a circuit constraint, or the proof policy
//!   forbids the backend. Retrying the same input cannot succeed.
//! - Retryable: the backend is unreachable, ran out of resources, crashed or
//!   timed out. The service discards the prover instance and the next call
//!   runs against a fresh one.

use std::path::PathBuf;

use thiserror::Error;

use polyseal_core::{CanonicalizationError, RuleKind};

use crate::policy::PolicyError;

/// The witness could not be shaped to the circuit ABI.
#[derive(Error, Debug)]
pub enum WitnessError {
    #[error("whitelist path has {depth} levels; the circuit supports at most {max}")]
    PathTooDeep { depth: usize, max: usize },

    #[error("leaf index {leaf_index} does not fit a path of {depth} levels")]
    LeafIndexOutOfRange { leaf_index: u64, depth: usize },

    #[error("policy commitment could not be computed: {0}")]
    Commitment(#[from] CanonicalizationError),
}

/// The compiled-circuit artifact could not be loaded.
#[derive(Error, Debug)]
pub enum CircuitError {
    #[error("failed to read circuit artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("circuit artifact is malformed: {0}")]
    Malformed(String),

    #[error("circuit ABI version {found} is not supported (expected {expected})")]
    UnsupportedAbi { found: u32, expected: u32 },

    #[error("circuit artifact has no bytecode")]
    EmptyBytecode,
}

/// Failure reported by a proving backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend could not be reached or initialized.
    #[error("proving backend unavailable: {0}")]
    Unavailable(String),

    #[error("proving backend exhausted its resources: {0}")]
    ResourceExhausted(String),

    /// The prover failed internally; its state is suspect.
    #[error("prover failed: {0}")]
    ProverFailed(String),

    /// Witness width or version does not match the circuit.
    #[error("witness does not match circuit ABI: {0}")]
    AbiMismatch(String),

    /// The witness is well-formed but violates a circuit constraint. `kind`
    /// names the rule whose constraint failed, when the backend can tell.
    #[error("circuit constraint not satisfied: {reason}")]
    ConstraintUnsatisfied {
        kind: Option<RuleKind>,
        reason: String,
    },

    #[error("malformed proof: {0}")]
    MalformedProof(String),
}

impl BackendError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::ResourceExhausted(_) | Self::ProverFailed(_)
        )
    }
}

/// Errors surfaced by [`crate::ProofService`].
#[derive(Error, Debug)]
pub enum ProofServiceError {
    #[error(transparent)]
    Witness(#[from] WitnessError),

    #[error("proving backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("proof generation timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// The witness was built for a different ABI version than the loaded circuit.
    #[error("witness ABI v{witness} does not match circuit ABI v{circuit}")]
    AbiVersion { witness: u32, circuit: u32 },

    #[error("internal proof service error: {0}")]
    Internal(String),
}

impl ProofServiceError {
    /// Whether the same request may succeed after the backend is reinitialized.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Backend(e) => e.is_retryable(),
            Self::Timeout { .. } | Self::Internal(_) => true,
            Self::Witness(_) | Self::Policy(_) | Self::AbiVersion { .. } => false,
        }
    }
}
