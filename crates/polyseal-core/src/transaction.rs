//! # Proposed Transaction
//!
//! The read-only description of what an adapter intends to execute. The
//! policy engine and witness builder consume it; nothing in the core mutates
//! it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::identity::{AdapterId, Address, AssetId, ChainId};

/// A transaction proposed by an adapter, awaiting authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedTransaction {
    pub chain: ChainId,
    pub adapter_id: AdapterId,
    pub recipient: Address,
    pub asset: AssetId,
    pub amount: Amount,
    /// Adapter-specific extra data (calldata, memo, gas hints). Sorted keys.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}
