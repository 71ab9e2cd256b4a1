//! Layout properties of the ABI v1 witness over arbitrary configs.

use proptest::prelude::*;

use polyseal_core::{AdapterId, Address, Amount, AssetId, ChainId, ProposedTransaction, Timestamp};
use polyseal_crypto::Hash32;
use polyseal_policy::{
    PolicyConfig, RecipientWhitelistFragment, SpendLimitFragment, TimeWindowFragment,
    VelocityFragment,
};
use polyseal_proof::field::FieldElement;
use polyseal_proof::witness::{private_slot, public_slot};
use polyseal_proof::{build_witness, MAX_PATH_DEPTH};

fn tx(recipient: u8, amount: u128) -> ProposedTransaction {
    ProposedTransaction {
        chain: ChainId::new("eip155:1").unwrap(),
        adapter_id: AdapterId::new("erc20-transfer").unwrap(),
        recipient: Address::from_bytes([recipient; 20]),
        asset: AssetId::new("usdc").unwrap(),
        amount: Amount::new(amount),
        metadata: Default::default(),
    }
}

fn arb_whitelist() -> impl Strategy<Value = Option<RecipientWhitelistFragment>> {
    proptest::option::of((0..=MAX_PATH_DEPTH, any::<u64>(), any::<u8>()).prop_map(
        |(depth, index, seed)| RecipientWhitelistFragment {
            enabled: true,
            merkle_root: Hash32([seed; 32]),
            leaf_index: if depth == 0 { 0 } else { index % (1u64 << depth) },
            path: (0..depth).map(|i| Hash32([seed ^ i as u8; 32])).collect(),
        },
    ))
}

fn arb_config() -> impl Strategy<Value = PolicyConfig> {
    (
        arb_whitelist(),
        proptest::option::of((0u8..23, 1u8..24)),
        proptest::option::of(any::<u128>()),
        proptest::option::of((1u64..100_000, proptest::option::of(any::<u64>()))),
    )
        .prop_map(|(whitelist, window, max, velocity)| PolicyConfig {
            recipient_whitelist: whitelist,
            time_window: window.map(|(start, span)| TimeWindowFragment {
                enabled: true,
                start_hour: start,
                end_hour: (start + span).min(23),
            }),
            spend_limit: max.map(|m| SpendLimitFragment {
                enabled: true,
                max_amount: Amount::new(m),
            }),
            velocity: velocity.map(|(min, last)| VelocityFragment {
                enabled: true,
                min_interval_seconds: min,
                last_execution_time: last,
            }),
        })
}

proptest! {
    #[test]
    fn every_config_fills_the_abi_exactly(
        config in arb_config(),
        recipient in any::<u8>(),
        amount in any::<u128>(),
        secs in 0u64..4_000_000_000,
    ) {
        let at = Timestamp::from_unix_seconds(secs).unwrap();
        let witness = build_witness(&config, &tx(recipient, amount), &at).unwrap();

        prop_assert!(witness.has_abi_shape());
        prop_assert_eq!(witness.public_inputs.len(), public_slot::COUNT);
        prop_assert_eq!(witness.private_inputs.len(), private_slot::COUNT);
        prop_assert_eq!(witness.public(public_slot::AMOUNT).to_u128(), Some(amount));
        prop_assert_eq!(witness.public(public_slot::EXECUTION_TIME).to_u64(), Some(secs));
    }

    #[test]
    fn same_inputs_give_identical_witness(
        config in arb_config(),
        amount in any::<u128>(),
    ) {
        let at = Timestamp::from_unix_seconds(1_700_000_000).unwrap();
        let first = build_witness(&config, &tx(0xaa, amount), &at).unwrap();
        let second = build_witness(&config.clone(), &tx(0xaa, amount), &at).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn unused_path_slots_stay_zero(config in arb_config()) {
        let at = Timestamp::from_unix_seconds(1_700_000_000).unwrap();
        let witness = build_witness(&config, &tx(0xaa, 1), &at).unwrap();
        let depth = config.recipient_whitelist.as_ref().map_or(0, |w| w.path.len());
        for slot in depth..MAX_PATH_DEPTH {
            prop_assert_eq!(
                witness.private(private_slot::PATH_START + slot),
                FieldElement::ZERO
            );
        }
    }
}
