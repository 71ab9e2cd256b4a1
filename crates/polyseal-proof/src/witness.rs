//! # Witness Builder (ABI v1)
//!
//! Maps a [`PolicyConfig`] and the [`ProposedTransaction`] it was prepared for
//! into the exact slot layout the compiled circuit consumes. Every slot is a
//! 32-byte big-endian [`FieldElement`]; slot order is fixed by
//! [`public_slot`] and [`private_slot`].
//!
//! ## Public inputs
//!
//! | Slot | Value |
//! |------|-------|
//! | 0 | whitelist Merkle root (zero when the rule is absent) |
//! | 1 | recipient address |
//! | 2 | SHA-256 of the asset id, top byte cleared |
//! | 3 | amount |
//! | 4 | execution timestamp, unix seconds |
//! | 5 | policy commitment: SHA-256 of the canonical `PolicyConfig`, top byte cleared |
//!
//! ## Private inputs
//!
//! Whitelist enabled, leaf index, path length, 16 path slots (zero padded),
//! time-window enabled/start/end, spend-limit enabled/max, velocity
//! enabled/min interval/last execution. A disabled rule contributes zeros.
//!
//! The time window is enforced by the circuit against slot 4, so the window
//! bounds never leave the witness.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use polyseal_core::{sha256_digest, ProposedTransaction, Timestamp};
use polyseal_policy::rules::recipient_whitelist;
use polyseal_policy::PolicyConfig;

use crate::error::WitnessError;
use crate::field::FieldElement;

pub const ABI_VERSION: u32 = 1;

/// Deepest whitelist path the circuit accepts. The whitelist rule rejects
/// documents whose tree would be deeper.
pub const MAX_PATH_DEPTH: usize = recipient_whitelist::MAX_TREE_DEPTH as usize;

pub mod public_slot {
    pub const WHITELIST_ROOT: usize = 0;
    pub const RECIPIENT: usize = 1;
    pub const ASSET_HASH: usize = 2;
    pub const AMOUNT: usize = 3;
    pub const EXECUTION_TIME: usize = 4;
    pub const POLICY_COMMITMENT: usize = 5;
    pub const COUNT: usize = 6;
}

pub mod private_slot {
    use super::MAX_PATH_DEPTH;

    pub const WHITELIST_ENABLED: usize = 0;
    pub const LEAF_INDEX: usize = 1;
    pub const PATH_LEN: usize = 2;
    pub const PATH_START: usize = 3;
    pub const TIME_WINDOW_ENABLED: usize = PATH_START + MAX_PATH_DEPTH;
    pub const TIME_WINDOW_START: usize = TIME_WINDOW_ENABLED + 1;
    pub const TIME_WINDOW_END: usize = TIME_WINDOW_ENABLED + 2;
    pub const SPEND_LIMIT_ENABLED: usize = TIME_WINDOW_END + 1;
    pub const SPEND_LIMIT_MAX: usize = SPEND_LIMIT_ENABLED + 1;
    pub const VELOCITY_ENABLED: usize = SPEND_LIMIT_MAX + 1;
    pub const VELOCITY_MIN_INTERVAL: usize = VELOCITY_ENABLED + 1;
    pub const VELOCITY_LAST_EXECUTION: usize = VELOCITY_ENABLED + 2;
    pub const COUNT: usize = VELOCITY_LAST_EXECUTION + 1;
}

/// Circuit input, split into what the verifier sees and what it does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Witness {
    pub abi_version: u32,
    pub public_inputs: Vec<FieldElement>,
    pub private_inputs: Vec<FieldElement>,
}

impl Witness {
    /// Slot value, zero when the slot is out of range.
    pub fn public(&self, slot: usize) -> FieldElement {
        self.public_inputs.get(slot).copied().unwrap_or(FieldElement::ZERO)
    }

    pub fn private(&self, slot: usize) -> FieldElement {
        self.private_inputs.get(slot).copied().unwrap_or(FieldElement::ZERO)
    }

    /// Whether the slot counts match ABI v1.
    pub fn has_abi_shape(&self) -> bool {
        self.abi_version == ABI_VERSION
            && self.public_inputs.len() == public_slot::COUNT
            && self.private_inputs.len() == private_slot::COUNT
    }
}

/// Commitment to the full merged configuration.
pub fn policy_commitment(config: &PolicyConfig) -> Result<FieldElement, WitnessError> {
    let digest = sha256_digest(&config.canonical_bytes()?);
    Ok(FieldElement::from_digest_truncated(digest.bytes))
}

fn asset_hash(tx: &ProposedTransaction) -> FieldElement {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&Sha256::digest(tx.asset.as_str().as_bytes()));
    FieldElement::from_digest_truncated(bytes)
}

/// Shape `config` and `tx` into an ABI v1 witness for a proof executed at
/// `execution_time`.
pub fn build_witness(
    config: &PolicyConfig,
    tx: &ProposedTransaction,
    execution_time: &Timestamp,
) -> Result<Witness, WitnessError> {
    let mut public = vec![FieldElement::ZERO; public_slot::COUNT];
    let mut private = vec![FieldElement::ZERO; private_slot::COUNT];

    if let Some(wl) = &config.recipient_whitelist {
        let depth = wl.path.len();
        if depth > MAX_PATH_DEPTH {
            return Err(WitnessError::PathTooDeep {
                depth,
                max: MAX_PATH_DEPTH,
            });
        }
        if wl.leaf_index >> depth != 0 {
            return Err(WitnessError::LeafIndexOutOfRange {
                leaf_index: wl.leaf_index,
                depth,
            });
        }
        public[public_slot::WHITELIST_ROOT] = FieldElement::from_hash(&wl.merkle_root);
        private[private_slot::WHITELIST_ENABLED] = FieldElement::from_bool(wl.enabled);
        private[private_slot::LEAF_INDEX] = FieldElement::from_u64(wl.leaf_index);
        private[private_slot::PATH_LEN] = FieldElement::from_u64(depth as u64);
        for (i, sibling) in wl.path.iter().enumerate() {
            private[private_slot::PATH_START + i] = FieldElement::from_hash(sibling);
        }
    }

    if let Some(tw) = &config.time_window {
        private[private_slot::TIME_WINDOW_ENABLED] = FieldElement::from_bool(tw.enabled);
        private[private_slot::TIME_WINDOW_START] = FieldElement::from_u64(u64::from(tw.start_hour));
        private[private_slot::TIME_WINDOW_END] = FieldElement::from_u64(u64::from(tw.end_hour));
    }

    if let Some(sl) = &config.spend_limit {
        private[private_slot::SPEND_LIMIT_ENABLED] = FieldElement::from_bool(sl.enabled);
        private[private_slot::SPEND_LIMIT_MAX] = FieldElement::from_amount(sl.max_amount);
    }

    if let Some(v) = &config.velocity {
        private[private_slot::VELOCITY_ENABLED] = FieldElement::from_bool(v.enabled);
        private[private_slot::VELOCITY_MIN_INTERVAL] = FieldElement::from_u64(v.min_interval_seconds);
        private[private_slot::VELOCITY_LAST_EXECUTION] =
            FieldElement::from_u64(v.last_execution_time.unwrap_or(0));
    }

    public[public_slot::RECIPIENT] = FieldElement::from_address(&tx.recipient);
    public[public_slot::ASSET_HASH] = asset_hash(tx);
    public[public_slot::AMOUNT] = FieldElement::from_amount(tx.amount);
    public[public_slot::EXECUTION_TIME] = FieldElement::from_timestamp(execution_time);
    public[public_slot::POLICY_COMMITMENT] = policy_commitment(config)?;

    Ok(Witness {
        abi_version: ABI_VERSION,
        public_inputs: public,
        private_inputs: private,
    })
}
