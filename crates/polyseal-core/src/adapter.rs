//! # Adapter Contract
//!
//! Adapters turn a high-level user intent ("send 10 USDC to Bob") into a
//! [`ProposedTransaction`]. They live outside the core; this module only fixes
//! the interface the rest of the system programs against.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::AdapterId;
use crate::rule_kind::RuleKind;
use crate::transaction::ProposedTransaction;

/// Static description of an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterMetadata {
    pub id: AdapterId,
    pub name: String,
    /// Rule kinds a user's policy must contain before this adapter may act.
    #[serde(default)]
    pub required_policy_kinds: Vec<RuleKind>,
}

/// Failure to turn an intent into a transaction.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("unsupported intent: {0}")]
    UnsupportedIntent(String),

    #[error("invalid intent field {field}: {reason}")]
    InvalidIntent { field: String, reason: String },

    #[error(transparent)]
    Validation(#[from] crate::error::ValidationError),
}

/// A chain/action-specific transaction builder.
pub trait Adapter: Send + Sync {
    fn metadata(&self) -> AdapterMetadata;

    /// Build a transaction from an adapter-specific intent payload.
    fn build_proposed_transaction(
        &self,
        intent: &serde_json::Value,
    ) -> Result<ProposedTransaction, AdapterError>;
}
