//! # Proving Backend Contract
//!
//! The external prover/verifier library sits behind [`ProvingBackend`].
//! Implementations are synchronous and CPU bound; [`crate::ProofService`]
//! runs `prove` on the blocking pool and never calls it concurrently on one
//! instance.
//!
//! Instances are produced by a [`BackendFactory`] so the service can discard
//! a prover whose state is suspect and build a fresh one.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::circuit::CompiledCircuit;
use crate::error::BackendError;
use crate::field::FieldElement;
use crate::witness::Witness;

/// Which family of backend produced a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Deterministic digest, no soundness.
    Mock,
    /// A real proving system supplied by the circuit toolchain.
    External,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::External => "external",
        }
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Self::External)
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait ProvingBackend: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> BackendKind;

    /// Produce proof bytes for `witness` against `circuit`.
    fn prove(&self, circuit: &CompiledCircuit, witness: &Witness) -> Result<Vec<u8>, BackendError>;

    /// `Ok(false)` for a well-formed proof that does not verify.
    fn verify(
        &self,
        circuit: &CompiledCircuit,
        proof: &[u8],
        public_inputs: &[FieldElement],
    ) -> Result<bool, BackendError>;
}

/// Builds backend instances.
pub trait BackendFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn ProvingBackend>, BackendError>;
}

impl<F> BackendFactory for F
where
    F: Fn() -> Result<Arc<dyn ProvingBackend>, BackendError> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn ProvingBackend>, BackendError> {
        self()
    }
}
