//! Proof requests and results. A request is created per authorization
//! attempt and never reused for another transaction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use polyseal_core::ContentDigest;

use crate::backend::BackendKind;
use crate::circuit::{hex_vec, CompiledCircuit};
use crate::field::FieldElement;
use crate::witness::Witness;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    pub request_id: Uuid,
    pub circuit_digest: ContentDigest,
    pub witness: Witness,
}

impl ProofRequest {
    pub fn new(circuit: &CompiledCircuit, witness: Witness) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            circuit_digest: circuit.digest(),
            witness,
        }
    }
}

/// Opaque proof bytes plus everything a verifier needs without the policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofResult {
    pub request_id: Uuid,
    pub circuit_digest: ContentDigest,
    pub backend: BackendKind,
    pub backend_name: String,
    #[serde(with = "hex_vec")]
    pub proof: Vec<u8>,
    pub public_inputs: Vec<FieldElement>,
}
