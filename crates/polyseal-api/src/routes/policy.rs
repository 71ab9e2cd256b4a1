//! # Policy Routes
//!
//! | Method | Path                 | Result                              |
//! |--------|----------------------|-------------------------------------|
//! | POST   | `/policy/prepare`    | `PolicyConfig` or a structured error |
//! | POST   | `/policy/validate`   | compiled rules and their digest     |
//! | PUT    | `/policy/documents`  | stores a document after validation  |
//! | GET    | `/policy/rules`      | the rule catalog                    |

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use polyseal_core::{AdapterId, Address, ContentDigest, ProposedTransaction, Timestamp};
use polyseal_policy::{
    PolicyConfig, PolicyDocument, PolicyStore, PrepareOptions, RuleDescriptor, RuleParams,
    RuleRegistry,
};

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareRequest {
    pub user_address: Address,
    pub adapter_id: AdapterId,
    pub proposed_tx: ProposedTransaction,
    #[serde(default)]
    pub last_execution_time: Option<Timestamp>,
    #[serde(default)]
    pub evaluated_at: Option<Timestamp>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub document: Value,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub rules: Vec<RuleParams>,
    pub digest: ContentDigest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocumentRequest {
    pub user_address: Address,
    pub adapter_id: AdapterId,
    pub document: Value,
    /// Replace the user's documents for this adapter instead of appending.
    #[serde(default)]
    pub replace: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocumentResponse {
    /// Documents now active for the `(user, adapter)` pair.
    pub documents: usize,
    pub digest: ContentDigest,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/policy/prepare", post(prepare))
        .route("/policy/validate", post(validate))
        .route("/policy/documents", put(store_document))
        .route("/policy/rules", get(rules))
}

/// POST /policy/prepare: evaluate the user's policy for a proposed
/// transaction.
async fn prepare(
    State(state): State<AppState>,
    body: Result<Json<PrepareRequest>, JsonRejection>,
) -> Result<Json<PolicyConfig>, AppError> {
    let req = extract_json(body)?;
    let options = PrepareOptions {
        signal_source: state.signal_source.clone(),
        last_execution_time: req.last_execution_time,
        evaluated_at: req.evaluated_at,
    };
    let config = state
        .engine
        .prepare_config(&req.user_address, &req.adapter_id, &req.proposed_tx, options)
        .await?;
    Ok(Json(config))
}

/// POST /policy/validate: validate and compile a document without storing it.
async fn validate(
    State(state): State<AppState>,
    body: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<ValidateResponse>, AppError> {
    let req = extract_json(body)?;
    let compiled = state.validator.validate_value(&req.document)?;
    let digest = compiled.digest()?;
    Ok(Json(ValidateResponse {
        rules: compiled.rules().to_vec(),
        digest,
    }))
}

/// PUT /policy/documents: validate, then append to (or replace) the user's
/// documents for an adapter. Invalid documents are never stored.
async fn store_document(
    State(state): State<AppState>,
    body: Result<Json<StoreDocumentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StoreDocumentResponse>), AppError> {
    let req = extract_json(body)?;
    let compiled = state.validator.validate_value(&req.document)?;
    let digest = compiled.digest()?;
    let document = PolicyDocument::from_value(req.document)?;

    if req.replace {
        state
            .store
            .replace(req.user_address.clone(), req.adapter_id.clone(), vec![document]);
    } else {
        state
            .store
            .insert(req.user_address.clone(), req.adapter_id.clone(), document);
    }

    let documents = state
        .store
        .get_user_policies(&req.user_address, &req.adapter_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .len();
    tracing::info!(
        user = %req.user_address,
        adapter = %req.adapter_id,
        documents,
        %digest,
        "policy document stored"
    );
    Ok((
        StatusCode::CREATED,
        Json(StoreDocumentResponse { documents, digest }),
    ))
}

/// GET /policy/rules: schema, defaults and signal dependence of every kind.
async fn rules() -> Json<Vec<RuleDescriptor>> {
    Json(RuleRegistry::descriptors())
}
