//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Keeps the four outcomes of an authorization attempt apart on the wire:
//! a malformed policy (422), a policy denial (403), an infrastructure
//! failure that may be retried (503), and a proof-backend failure (502 when
//! retryable, 500 when fatal).
//!
//! Internal and fatal backend messages are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use polyseal_core::{CanonicalizationError, RuleKind};
use polyseal_policy::{EngineError, SchemaError};
use polyseal_proof::{BackendError, ProofServiceError};

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "POLICY_DENIED").
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// The request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request parsed but its values are unusable (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// A policy document failed validation (422). Carries every issue.
    #[error(transparent)]
    Schema(SchemaError),

    /// A rule denied the transaction (403).
    #[error("policy denied by {kind}: {reason}")]
    PolicyDenied { kind: RuleKind, reason: String },

    /// A signal, the policy store or similar could not be reached (503).
    #[error("{message}")]
    Infrastructure {
        rule: Option<RuleKind>,
        signal: Option<String>,
        message: String,
    },

    /// The witness violates a circuit constraint (403). `kind` names the
    /// rule the constraint belongs to.
    #[error("{reason}")]
    ConstraintUnsatisfied {
        kind: Option<RuleKind>,
        reason: String,
    },

    /// The proving backend failed transiently (502).
    #[error("{0}")]
    ProofBackend(String),

    /// The proving backend failed in a way retrying cannot fix (500).
    #[error("{0}")]
    ProofBackendFatal(String),

    /// Internal server error (500). Message is logged but not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Schema(_) => (StatusCode::UNPROCESSABLE_ENTITY, "SCHEMA_ERROR"),
            Self::PolicyDenied { .. } => (StatusCode::FORBIDDEN, "POLICY_DENIED"),
            Self::Infrastructure { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "INFRASTRUCTURE_ERROR")
            }
            Self::ConstraintUnsatisfied { .. } => {
                (StatusCode::FORBIDDEN, "CONSTRAINT_UNSATISFIED")
            }
            Self::ProofBackend(_) => (StatusCode::BAD_GATEWAY, "PROOF_BACKEND_ERROR"),
            Self::ProofBackendFatal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PROOF_BACKEND_FATAL")
            }
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            Self::Schema(e) => Some(json!({ "issues": e.issues })),
            Self::PolicyDenied { kind, reason } => Some(json!({ "kind": kind, "reason": reason })),
            Self::Infrastructure { rule, signal, .. } => {
                let mut details = json!({ "retryable": true });
                if let Some(rule) = rule {
                    details["rule"] = json!(rule);
                }
                if let Some(signal) = signal {
                    details["signal"] = json!(signal);
                }
                Some(details)
            }
            Self::ConstraintUnsatisfied {
                kind: Some(kind), ..
            } => Some(json!({ "kind": kind, "retryable": false })),
            Self::ProofBackend(_) => Some(json!({ "retryable": true })),
            Self::ProofBackendFatal(_) => Some(json!({ "retryable": false })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::ProofBackendFatal(_) => "The proving backend rejected the request".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::ProofBackendFatal(_) => tracing::error!(error = %self, "fatal proof backend error"),
            Self::ProofBackend(_) => tracing::warn!(error = %self, "proof backend error"),
            Self::Infrastructure { .. } => tracing::warn!(error = %self, "infrastructure failure"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<SchemaError> for AppError {
    fn from(err: SchemaError) -> Self {
        Self::Schema(err)
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::Denied { kind, reason } => Self::PolicyDenied { kind, reason },
            EngineError::Infrastructure { rule, signal, .. } => Self::Infrastructure {
                rule,
                signal,
                message,
            },
            EngineError::Schema(e) => Self::Schema(e),
            EngineError::InvalidRequest(msg) => Self::BadRequest(msg),
            EngineError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<ProofServiceError> for AppError {
    fn from(err: ProofServiceError) -> Self {
        if err.is_retryable() {
            return Self::ProofBackend(err.to_string());
        }
        match err {
            ProofServiceError::Backend(BackendError::ConstraintUnsatisfied { kind, reason }) => {
                Self::ConstraintUnsatisfied { kind, reason }
            }
            ProofServiceError::Backend(BackendError::MalformedProof(msg)) => Self::BadRequest(msg),
            other => Self::ProofBackendFatal(other.to_string()),
        }
    }
}

impl From<CanonicalizationError> for AppError {
    fn from(err: CanonicalizationError) -> Self {
        Self::Internal(err.to_string())
    }
}
