//! # Proof Routes
//!
//! `POST /proof/generate` proves a prepared config against a transaction;
//! `POST /proof/verify` checks a proof against its public inputs. Both use
//! the circuit and backend loaded at startup.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use polyseal_core::{ContentDigest, ProposedTransaction, Timestamp};
use polyseal_policy::PolicyConfig;
use polyseal_proof::circuit::hex_vec;
use polyseal_proof::{BackendKind, FieldElement, ProofResult};

use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub policy_config: PolicyConfig,
    pub proposed_tx: ProposedTransaction,
    /// Public execution timestamp; the current time when absent.
    #[serde(default)]
    pub execution_time: Option<Timestamp>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(with = "hex_vec")]
    pub proof: Vec<u8>,
    pub public_inputs: Vec<FieldElement>,
    pub backend: BackendKind,
    /// When present, must match the loaded circuit.
    #[serde(default)]
    pub circuit_digest: Option<ContentDigest>,
}

impl Validate for VerifyRequest {
    fn validate(&self) -> Result<(), String> {
        if self.proof.is_empty() {
            return Err("proof must not be empty".into());
        }
        if self.public_inputs.is_empty() {
            return Err("publicInputs must not be empty".into());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/proof/generate", post(generate))
        .route("/proof/verify", post(verify))
}

/// POST /proof/generate: build the witness and prove it. Requests queue
/// behind the single prover.
async fn generate(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<ProofResult>, AppError> {
    let req = extract_json(body)?;
    let execution_time = req.execution_time.unwrap_or_else(Timestamp::now);
    let result = state
        .proofs
        .prove_config(&req.policy_config, &req.proposed_tx, &execution_time)
        .await?;
    tracing::info!(
        request_id = %result.request_id,
        backend = %result.backend,
        "proof generated"
    );
    Ok(Json(result))
}

/// POST /proof/verify: `{ "valid": false }` for a proof that does not check
/// out; errors only for unusable input.
async fn verify(
    State(state): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, AppError> {
    let req = extract_validated_json(body)?;
    if let Some(digest) = &req.circuit_digest {
        if digest != state.proofs.circuit_digest() {
            tracing::debug!(%digest, "proof made for another circuit");
            return Ok(Json(VerifyResponse { valid: false }));
        }
    }
    let valid = state
        .proofs
        .verify_proof(&req.proof, &req.public_inputs, req.backend)?;
    Ok(Json(VerifyResponse { valid }))
}
