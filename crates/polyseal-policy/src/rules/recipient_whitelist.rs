//! Recipient-whitelist rule.
//!
//! Commits the whitelist as a Merkle root and emits the recipient's
//! membership path, so the circuit can check membership without the set
//! being published. A recipient outside the set is a denial, not an error.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use polyseal_core::{Address, RuleKind};
use polyseal_crypto::{CryptoError, MerkleHasher, Sha256MerkleHasher, WhitelistTreeBuilder};

use super::{FieldIssue, Rule};
use crate::config::{ConfigFragment, RecipientWhitelistFragment};
use crate::context::PolicyContext;
use crate::error::RuleError;

pub const NOT_WHITELISTED: &str = "recipient not in whitelist";

/// Deepest membership path the proof circuit accepts.
pub const MAX_TREE_DEPTH: u32 = 16;

/// Distinct addresses that fit a tree of [`MAX_TREE_DEPTH`].
pub const MAX_ADDRESSES: usize = 1 << MAX_TREE_DEPTH;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecipientWhitelistParams {
    /// Canonical, sorted and deduplicated after normalization.
    pub addresses: Vec<Address>,
}

pub struct RecipientWhitelistRule {
    builder: WhitelistTreeBuilder<Arc<dyn MerkleHasher>>,
}

impl RecipientWhitelistRule {
    pub fn new(hasher: Arc<dyn MerkleHasher>) -> Self {
        Self {
            builder: WhitelistTreeBuilder::new(hasher),
        }
    }

    pub fn tree_builder(&self) -> &WhitelistTreeBuilder<Arc<dyn MerkleHasher>> {
        &self.builder
    }
}

impl Default for RecipientWhitelistRule {
    fn default() -> Self {
        Self::new(Arc::new(Sha256MerkleHasher))
    }
}

impl std::fmt::Debug for RecipientWhitelistRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipientWhitelistRule")
            .field("hasher", &self.builder.hasher().id())
            .finish()
    }
}

impl Rule for RecipientWhitelistRule {
    type Params = RecipientWhitelistParams;

    const KIND: RuleKind = RuleKind::RecipientWhitelist;

    fn schema() -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "addresses": {
                    "type": "array",
                    "minItems": 1,
                    "items": { "type": "string", "pattern": "^(0[xX])?[0-9a-fA-F]{40}$" }
                }
            }
        })
    }

    fn required() -> &'static [&'static str] {
        &["addresses"]
    }

    /// Counted after normalization, so repeated spellings of one address
    /// do not count against the cap.
    fn check(params: &RecipientWhitelistParams) -> Vec<FieldIssue> {
        let distinct = params.addresses.iter().collect::<BTreeSet<_>>().len();
        if distinct > MAX_ADDRESSES {
            return vec![FieldIssue::new(
                "addresses",
                format!("{distinct} distinct addresses exceed the limit of {MAX_ADDRESSES}"),
            )];
        }
        Vec::new()
    }

    fn normalize(mut params: RecipientWhitelistParams) -> RecipientWhitelistParams {
        params.addresses.sort();
        params.addresses.dedup();
        params
    }

    fn prepare(
        &self,
        params: &RecipientWhitelistParams,
        ctx: &PolicyContext,
    ) -> Result<ConfigFragment, RuleError> {
        let tree = self
            .builder
            .build(&params.addresses)
            .map_err(|e| RuleError::Internal(e.to_string()))?;
        let proof = match tree.prove_inclusion(&ctx.transaction.recipient) {
            Ok(proof) => proof,
            Err(CryptoError::NotFound(_)) => return Err(RuleError::denied(NOT_WHITELISTED)),
            Err(e) => return Err(RuleError::Internal(e.to_string())),
        };
        Ok(ConfigFragment::RecipientWhitelist(
            RecipientWhitelistFragment {
                enabled: true,
                merkle_root: tree.root(),
                leaf_index: proof.leaf_index,
                path: proof.siblings(),
            },
        ))
    }
}
