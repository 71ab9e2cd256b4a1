//! # Mock Proving Backend
//!
//! Deterministic and transparent. It checks the witness against the same
//! constraints the policy circuit enforces, then emits
//! `SHA-256(circuit_digest || public_inputs)` as the "proof". Verification
//! recomputes that digest. No zero-knowledge and no soundness: anyone who
//! knows the public inputs can forge a proof, which is why production mode
//! rejects it (see [`crate::ProofPolicy`]).

use std::sync::Arc;

use sha2::{Digest, Sha256};

use polyseal_core::{RuleKind, Timestamp};
use polyseal_crypto::{
    verify_inclusion, Hash32, InclusionProof, MerkleHasher, PathStep, Sha256MerkleHasher, Side,
};

use crate::backend::{BackendKind, ProvingBackend};
use crate::circuit::CompiledCircuit;
use crate::error::BackendError;
use crate::field::FieldElement;
use crate::witness::{private_slot, public_slot, Witness, ABI_VERSION, MAX_PATH_DEPTH};

const PROOF_LEN: usize = 32;

pub struct MockBackend {
    hasher: Arc<dyn MerkleHasher>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_hasher(Arc::new(Sha256MerkleHasher))
    }

    /// A mock that checks whitelist paths with `hasher`; it must be the
    /// hasher the policy registry built the tree with.
    pub fn with_hasher(hasher: Arc<dyn MerkleHasher>) -> Self {
        Self { hasher }
    }

    fn proof_bytes(circuit: &CompiledCircuit, public_inputs: &[FieldElement]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(circuit.digest().bytes);
        for input in public_inputs {
            hasher.update(input.as_bytes());
        }
        hasher.finalize().to_vec()
    }

    fn check_shape(&self, witness: &Witness) -> Result<(), BackendError> {
        if witness.has_abi_shape() {
            return Ok(());
        }
        Err(BackendError::AbiMismatch(format!(
            "expected ABI v{ABI_VERSION} with {}/{} slots, got v{} with {}/{}",
            public_slot::COUNT,
            private_slot::COUNT,
            witness.abi_version,
            witness.public_inputs.len(),
            witness.private_inputs.len()
        )))
    }

    fn check_constraints(&self, w: &Witness) -> Result<(), BackendError> {
        let unsatisfied = |kind: RuleKind, reason: String| BackendError::ConstraintUnsatisfied {
            kind: Some(kind),
            reason,
        };
        let int = |f: FieldElement, what: &str| {
            f.to_u64()
                .ok_or_else(|| BackendError::AbiMismatch(format!("{what} does not fit 64 bits")))
        };
        let enabled = |slot: usize| w.private(slot) != FieldElement::ZERO;

        if enabled(private_slot::WHITELIST_ENABLED) {
            let recipient = w
                .public(public_slot::RECIPIENT)
                .to_address()
                .ok_or_else(|| BackendError::AbiMismatch("recipient is not an address".into()))?;
            let leaf_index = int(w.private(private_slot::LEAF_INDEX), "leaf index")?;
            let depth = int(w.private(private_slot::PATH_LEN), "path length")? as usize;
            if depth > MAX_PATH_DEPTH {
                return Err(BackendError::AbiMismatch(format!("path length {depth}")));
            }
            let path = (0..depth)
                .map(|level| PathStep {
                    side: if (leaf_index >> level) & 1 == 1 {
                        Side::Left
                    } else {
                        Side::Right
                    },
                    hash: Hash32(*w.private(private_slot::PATH_START + level).as_bytes()),
                })
                .collect();
            let proof = InclusionProof {
                leaf_index,
                leaf_hash: self.hasher.hash_leaf(&recipient),
                path,
            };
            let root = Hash32(*w.public(public_slot::WHITELIST_ROOT).as_bytes());
            if !verify_inclusion(self.hasher.as_ref(), &root, &recipient, &proof) {
                return Err(unsatisfied(
                    RuleKind::RecipientWhitelist,
                    "recipient path does not reach whitelist root".into(),
                ));
            }
        }

        let executed_at = int(w.public(public_slot::EXECUTION_TIME), "execution time")?;

        if enabled(private_slot::TIME_WINDOW_ENABLED) {
            let start = int(w.private(private_slot::TIME_WINDOW_START), "window start")?;
            let end = int(w.private(private_slot::TIME_WINDOW_END), "window end")?;
            let hour = Timestamp::from_unix_seconds(executed_at)
                .map_err(|e| BackendError::AbiMismatch(e.to_string()))?
                .hour();
            if !(start..=end).contains(&u64::from(hour)) {
                return Err(unsatisfied(
                    RuleKind::TimeWindow,
                    format!("execution hour {hour} outside permitted window"),
                ));
            }
        }

        if enabled(private_slot::SPEND_LIMIT_ENABLED)
            && w.public(public_slot::AMOUNT) > w.private(private_slot::SPEND_LIMIT_MAX)
        {
            return Err(unsatisfied(RuleKind::SpendLimit, "amount exceeds spend limit".into()));
        }

        if enabled(private_slot::VELOCITY_ENABLED) {
            let min = int(w.private(private_slot::VELOCITY_MIN_INTERVAL), "min interval")?;
            let last = int(w.private(private_slot::VELOCITY_LAST_EXECUTION), "last execution")?;
            if last != 0 && executed_at.saturating_sub(last) < min {
                return Err(unsatisfied(
                    RuleKind::Velocity,
                    "minimum interval since last execution not met".into(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvingBackend for MockBackend {
    fn name(&self) -> &str {
        "mock-sha256"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Mock
    }

    fn prove(&self, circuit: &CompiledCircuit, witness: &Witness) -> Result<Vec<u8>, BackendError> {
        self.check_shape(witness)?;
        self.check_constraints(witness)?;
        Ok(Self::proof_bytes(circuit, &witness.public_inputs))
    }

    fn verify(
        &self,
        circuit: &CompiledCircuit,
        proof: &[u8],
        public_inputs: &[FieldElement],
    ) -> Result<bool, BackendError> {
        if proof.len() != PROOF_LEN {
            return Err(BackendError::MalformedProof(format!(
                "expected {PROOF_LEN} bytes, got {}",
                proof.len()
            )));
        }
        if public_inputs.len() != public_slot::COUNT {
            return Ok(false);
        }
        Ok(Self::proof_bytes(circuit, public_inputs) == proof)
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("hasher", &self.hasher.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyseal_core::{AdapterId, Address, Amount, AssetId, ChainId, ProposedTransaction};
    use polyseal_crypto::WhitelistTreeBuilder;
    use polyseal_policy::{
        PolicyConfig, RecipientWhitelistFragment, SpendLimitFragment, TimeWindowFragment,
        VelocityFragment,
    };

    use crate::witness::build_witness;

    // 2023-11-14T22:13:20Z
    const EXEC: u64 = 1_700_000_000;

    fn tx(recipient: Address, amount: u128) -> ProposedTransaction {
        ProposedTransaction {
            chain: ChainId::new("eip155:1").unwrap(),
            adapter_id: AdapterId::new("erc20-transfer").unwrap(),
            recipient,
            asset: AssetId::new("usdc").unwrap(),
            amount: Amount::new(amount),
            metadata: Default::default(),
        }
    }

    fn witness(config: &PolicyConfig, tx: &ProposedTransaction) -> Witness {
        build_witness(config, tx, &Timestamp::from_unix_seconds(EXEC).unwrap()).unwrap()
    }

    fn whitelist_config(members: &[Address], recipient: &Address) -> PolicyConfig {
        let tree = WhitelistTreeBuilder::new(Sha256MerkleHasher).build(members).unwrap();
        let proof = tree.prove_inclusion(recipient).unwrap();
        PolicyConfig {
            recipient_whitelist: Some(RecipientWhitelistFragment {
                enabled: true,
                merkle_root: tree.root(),
                leaf_index: proof.leaf_index,
                path: proof.siblings(),
            }),
            ..PolicyConfig::default()
        }
    }

    #[test]
    fn proves_and_verifies_valid_whitelist_witness() {
        let members: Vec<Address> = (1u8..=5).map(|b| Address::from_bytes([b; 20])).collect();
        let recipient = members[3].clone();
        let config = whitelist_config(&members, &recipient);
        let w = witness(&config, &tx(recipient, 1));

        let circuit = CompiledCircuit::development();
        let backend = MockBackend::new();
        let proof = backend.prove(&circuit, &w).unwrap();
        assert_eq!(proof.len(), PROOF_LEN);
        assert!(backend.verify(&circuit, &proof, &w.public_inputs).unwrap());

        let mut tampered = w.public_inputs.clone();
        tampered[public_slot::AMOUNT] = FieldElement::from_u64(2);
        assert!(!backend.verify(&circuit, &proof, &tampered).unwrap());
    }

    #[test]
    fn recipient_swap_breaks_whitelist_constraint() {
        let members = vec![Address::from_bytes([1; 20]), Address::from_bytes([2; 20])];
        let config = whitelist_config(&members, &members[0]);
        let w = witness(&config, &tx(Address::from_bytes([9; 20]), 1));
        let err = MockBackend::new()
            .prove(&CompiledCircuit::development(), &w)
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::ConstraintUnsatisfied {
                kind: Some(RuleKind::RecipientWhitelist),
                ..
            }
        ));
        assert!(!err.is_retryable());
    }

    #[test]
    fn execution_outside_window_is_unsatisfied() {
        let window = |start, end| PolicyConfig {
            time_window: Some(TimeWindowFragment {
                enabled: true,
                start_hour: start,
                end_hour: end,
            }),
            ..PolicyConfig::default()
        };
        let t = tx(Address::from_bytes([1; 20]), 1);
        let backend = MockBackend::new();
        let circuit = CompiledCircuit::development();
        assert!(backend.prove(&circuit, &witness(&window(20, 23), &t)).is_ok());
        assert!(matches!(
            backend.prove(&circuit, &witness(&window(9, 17), &t)),
            Err(BackendError::ConstraintUnsatisfied {
                kind: Some(RuleKind::TimeWindow),
                ..
            })
        ));
    }

    #[test]
    fn spend_and_velocity_constraints() {
        let config = PolicyConfig {
            spend_limit: Some(SpendLimitFragment {
                enabled: true,
                max_amount: Amount::new(100),
            }),
            velocity: Some(VelocityFragment {
                enabled: true,
                min_interval_seconds: 600,
                last_execution_time: Some(EXEC - 60),
            }),
            ..PolicyConfig::default()
        };
        let backend = MockBackend::new();
        let circuit = CompiledCircuit::development();
        let over = witness(&config, &tx(Address::from_bytes([1; 20]), 101));
        assert!(matches!(
            backend.prove(&circuit, &over),
            Err(BackendError::ConstraintUnsatisfied {
                kind: Some(RuleKind::SpendLimit),
                ..
            })
        ));
        let too_soon = witness(&config, &tx(Address::from_bytes([1; 20]), 50));
        assert!(matches!(
            backend.prove(&circuit, &too_soon),
            Err(BackendError::ConstraintUnsatisfied {
                kind: Some(RuleKind::Velocity),
                ..
            })
        ));
    }

    #[test]
    fn wrong_width_is_abi_mismatch() {
        let mut w = witness(&PolicyConfig::default(), &tx(Address::from_bytes([1; 20]), 1));
        w.private_inputs.pop();
        let err = MockBackend::new()
            .prove(&CompiledCircuit::development(), &w)
            .unwrap_err();
        assert!(matches!(err, BackendError::AbiMismatch(_)));
    }

    #[test]
    fn short_proof_is_malformed() {
        let err = MockBackend::new()
            .verify(&CompiledCircuit::development(), &[0u8; 4], &[])
            .unwrap_err();
        assert!(matches!(err, BackendError::MalformedProof(_)));
    }

    #[test]
    fn proof_is_bound_to_circuit() {
        let w = witness(&PolicyConfig::default(), &tx(Address::from_bytes([1; 20]), 1));
        let backend = MockBackend::new();
        let dev = CompiledCircuit::development();
        let other = CompiledCircuit::new("other", ABI_VERSION, vec![1]).unwrap();
        let proof = backend.prove(&dev, &w).unwrap();
        assert!(!backend.verify(&other, &proof, &w.public_inputs).unwrap());
    }
}
