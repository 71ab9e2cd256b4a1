//! # Proof Service
//!
//! Owns the compiled circuit and the prover instance for the whole process.
//!
//! - At most one `generate_proof` runs against the prover at a time; callers
//!   queue on an async mutex. Throughput comes from running more processes.
//! - Proving runs on the blocking pool under a timeout. A timeout or a
//!   retryable backend failure leaves the prover in an unknown state, so the
//!   instance is dropped and the next call builds a fresh one from the
//!   factory (or [`ProofService::reinitialize`] does it eagerly).
//! - Verification uses a separate instance and runs concurrently without
//!   taking the prover lock.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use polyseal_core::{ContentDigest, ProposedTransaction, Timestamp};
use polyseal_policy::PolicyConfig;

use crate::backend::{BackendFactory, BackendKind, ProvingBackend};
use crate::circuit::CompiledCircuit;
use crate::error::{BackendError, ProofServiceError};
use crate::field::FieldElement;
use crate::policy::ProofPolicy;
use crate::request::{ProofRequest, ProofResult};
use crate::witness::{build_witness, Witness};

pub const DEFAULT_PROVE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct ProofServiceConfig {
    pub prove_timeout: Duration,
    pub policy: ProofPolicy,
}

impl Default for ProofServiceConfig {
    fn default() -> Self {
        Self {
            prove_timeout: DEFAULT_PROVE_TIMEOUT,
            policy: ProofPolicy::from_environment(),
        }
    }
}

pub struct ProofService {
    circuit: Arc<CompiledCircuit>,
    circuit_digest: ContentDigest,
    factory: Arc<dyn BackendFactory>,
    prover: Mutex<Option<Arc<dyn ProvingBackend>>>,
    verifier: Arc<dyn ProvingBackend>,
    config: ProofServiceConfig,
}

impl ProofService {
    /// Build the service. The verifier must come up; a prover that fails to
    /// start is retried on the first proof request.
    pub fn new(
        circuit: Arc<CompiledCircuit>,
        factory: Arc<dyn BackendFactory>,
        config: ProofServiceConfig,
    ) -> Result<Self, ProofServiceError> {
        let verifier = factory.create()?;
        let prover = match factory.create() {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(error = %e, "prover unavailable at startup; will retry on demand");
                None
            }
        };
        let circuit_digest = circuit.digest();
        tracing::info!(
            circuit = %circuit.circuit_id,
            digest = %circuit_digest,
            backend = verifier.name(),
            policy = ?config.policy.mode(),
            "proof service initialized"
        );
        Ok(Self {
            circuit,
            circuit_digest,
            factory,
            prover: Mutex::new(prover),
            verifier,
            config,
        })
    }

    pub fn circuit(&self) -> &CompiledCircuit {
        &self.circuit
    }

    pub fn circuit_digest(&self) -> &ContentDigest {
        &self.circuit_digest
    }

    pub fn policy(&self) -> &ProofPolicy {
        &self.config.policy
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.verifier.kind()
    }

    /// False only when the prover is known to be down. A prover busy with a
    /// request counts as ready.
    pub fn has_prover(&self) -> bool {
        match self.prover.try_lock() {
            Ok(slot) => slot.is_some(),
            Err(_) => true,
        }
    }

    /// Shape the witness for `config`/`tx` and prove it.
    pub async fn prove_config(
        &self,
        config: &PolicyConfig,
        tx: &ProposedTransaction,
        execution_time: &Timestamp,
    ) -> Result<ProofResult, ProofServiceError> {
        let witness = build_witness(config, tx, execution_time)?;
        self.generate_proof(witness).await
    }

    pub async fn generate_proof(&self, witness: Witness) -> Result<ProofResult, ProofServiceError> {
        if witness.abi_version != self.circuit.abi_version {
            return Err(ProofServiceError::AbiVersion {
                witness: witness.abi_version,
                circuit: self.circuit.abi_version,
            });
        }

        let mut slot = self.prover.lock().await;
        let backend = match slot.as_ref() {
            Some(backend) => Arc::clone(backend),
            None => {
                let backend = self.factory.create().map_err(|e| {
                    tracing::warn!(error = %e, "prover reinitialization failed");
                    e
                })?;
                tracing::info!(backend = backend.name(), "prover reinitialized");
                *slot = Some(Arc::clone(&backend));
                backend
            }
        };
        self.config.policy.validate(backend.kind())?;

        let request = ProofRequest::new(&self.circuit, witness);
        let request_id = request.request_id;
        let circuit = Arc::clone(&self.circuit);
        let prover = Arc::clone(&backend);
        let task = tokio::task::spawn_blocking(move || {
            let outcome = prover.prove(&circuit, &request.witness);
            (request, outcome)
        });

        match tokio::time::timeout(self.config.prove_timeout, task).await {
            Err(_) => {
                *slot = None;
                tracing::warn!(%request_id, timeout = ?self.config.prove_timeout, "proof generation timed out; prover discarded");
                Err(ProofServiceError::Timeout {
                    secs: self.config.prove_timeout.as_secs(),
                })
            }
            Ok(Err(join)) => {
                *slot = None;
                tracing::error!(%request_id, error = %join, "prover task aborted; prover discarded");
                Err(BackendError::ProverFailed(format!("prover task aborted: {join}")).into())
            }
            Ok(Ok((_, Err(e)))) => {
                if e.is_retryable() {
                    *slot = None;
                    tracing::warn!(%request_id, error = %e, "retryable prover failure; prover discarded");
                } else {
                    tracing::info!(%request_id, error = %e, "proof request rejected by backend");
                }
                Err(e.into())
            }
            Ok(Ok((request, Ok(proof)))) => {
                tracing::debug!(%request_id, bytes = proof.len(), "proof generated");
                Ok(ProofResult {
                    request_id,
                    circuit_digest: request.circuit_digest,
                    backend: backend.kind(),
                    backend_name: backend.name().to_string(),
                    proof,
                    public_inputs: request.witness.public_inputs,
                })
            }
        }
    }

    /// Check `proof` against `public_inputs`. Proofs from another backend
    /// family never verify here.
    pub fn verify_proof(
        &self,
        proof: &[u8],
        public_inputs: &[FieldElement],
        backend: BackendKind,
    ) -> Result<bool, ProofServiceError> {
        self.config.policy.validate(backend)?;
        if backend != self.verifier.kind() {
            tracing::debug!(%backend, "proof from foreign backend family");
            return Ok(false);
        }
        Ok(self.verifier.verify(&self.circuit, proof, public_inputs)?)
    }

    /// Replace the prover with a fresh instance, waiting for any in-flight
    /// request to finish first.
    pub async fn reinitialize(&self) -> Result<(), ProofServiceError> {
        let mut slot = self.prover.lock().await;
        let backend = self.factory.create()?;
        tracing::info!(backend = backend.name(), "prover reinitialized on request");
        *slot = Some(backend);
        Ok(())
    }
}

impl std::fmt::Debug for ProofService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofService")
            .field("circuit", &self.circuit)
            .field("backend", &self.verifier.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
