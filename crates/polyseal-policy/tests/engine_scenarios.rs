//! # End-to-end Policy Engine Scenarios
//!
//! Drives the engine through the store, validator, compiler and rules:
//! whitelist acceptance and denial, the exact time-window config shape,
//! signal-dependent spend limits, velocity, and infrastructure failures.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use polyseal_core::{AdapterId, Address, Amount, AssetId, ChainId, ProposedTransaction, RuleKind, Timestamp};
use polyseal_crypto::{
    verify_inclusion, InclusionProof, MerkleHasher, PathStep, Sha256MerkleHasher, Side,
};
use polyseal_policy::{
    DocumentValidator, EngineError, InMemoryPolicyStore, PolicyDocument, PolicyEngine,
    PolicyStore, PrepareOptions, RuleConfig, RuleRegistry, SignalData, SignalError,
    SignalSource, StaticSignalSource, StoreError,
};

const AAA: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const BBB: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const CCC: &str = "0xcccccccccccccccccccccccccccccccccccccccc";
const LOW: &str = "0x1111111111111111111111111111111111111111";

fn user() -> Address {
    Address::parse("0x9999999999999999999999999999999999999999").unwrap()
}

fn adapter() -> AdapterId {
    AdapterId::new("erc20-transfer").unwrap()
}

fn tx(recipient: &str, amount: u128) -> ProposedTransaction {
    ProposedTransaction {
        chain: ChainId::new("eip155:1").unwrap(),
        adapter_id: adapter(),
        recipient: Address::parse(recipient).unwrap(),
        asset: AssetId::new("0xdac17f958d2ee523a2206206994597c13d831ec7").unwrap(),
        amount: Amount::new(amount),
        metadata: Default::default(),
    }
}

fn validator() -> Arc<DocumentValidator> {
    let registry = Arc::new(RuleRegistry::with_default_hasher().unwrap());
    Arc::new(DocumentValidator::new(registry).unwrap())
}

fn engine_with(documents: Vec<PolicyDocument>) -> PolicyEngine {
    let store = InMemoryPolicyStore::new();
    store.replace(user(), adapter(), documents);
    PolicyEngine::new(validator(), Arc::new(store))
}

fn whitelist(addresses: &[&str]) -> PolicyDocument {
    PolicyDocument::new(vec![RuleConfig::new(
        "recipient-whitelist",
        json!({ "addresses": addresses }),
    )])
}

fn at(secs: u64) -> Timestamp {
    Timestamp::from_unix_seconds(secs).unwrap()
}

fn options_at(secs: u64) -> PrepareOptions {
    PrepareOptions {
        evaluated_at: Some(at(secs)),
        ..PrepareOptions::default()
    }
}

// -- Whitelist ---------------------------------------------------------------

#[tokio::test]
async fn whitelisted_recipient_yields_enabled_fragment() {
    let engine = engine_with(vec![whitelist(&[AAA])]);
    let config = engine
        .prepare_config(&user(), &adapter(), &tx(AAA, 1), PrepareOptions::default())
        .await
        .unwrap();
    let fragment = config.recipient_whitelist.unwrap();
    assert!(fragment.enabled);
    assert_eq!(fragment.leaf_index, 0);
    assert!(config.time_window.is_none());
}

#[tokio::test]
async fn leaf_index_is_canonical_sort_position() {
    let engine = engine_with(vec![whitelist(&[CCC, AAA, LOW])]);
    let config = engine
        .prepare_config(&user(), &adapter(), &tx(AAA, 1), PrepareOptions::default())
        .await
        .unwrap();
    let fragment = config.recipient_whitelist.unwrap();
    assert_eq!(fragment.leaf_index, 1);

    // The emitted path walks back to the emitted root.
    let path = fragment
        .path
        .iter()
        .enumerate()
        .map(|(level, hash)| PathStep {
            side: if (fragment.leaf_index >> level) & 1 == 0 {
                Side::Right
            } else {
                Side::Left
            },
            hash: *hash,
        })
        .collect();
    let proof = InclusionProof {
        leaf_index: fragment.leaf_index,
        leaf_hash: Sha256MerkleHasher.hash_leaf(&Address::parse(AAA).unwrap()),
        path,
    };
    assert!(verify_inclusion(
        &Sha256MerkleHasher,
        &fragment.merkle_root,
        &Address::parse(AAA).unwrap(),
        &proof
    ));
}

#[tokio::test]
async fn recipient_outside_whitelist_is_denied() {
    let engine = engine_with(vec![whitelist(&[AAA])]);
    let err = engine
        .prepare_config(&user(), &adapter(), &tx(BBB, 1), PrepareOptions::default())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Denied {
            kind: RuleKind::RecipientWhitelist,
            reason: "recipient not in whitelist".into(),
        }
    );
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn whitelist_denial_wins_over_later_signal_failure() {
    let doc = PolicyDocument::new(vec![
        RuleConfig::new(
            "spend-limit",
            json!({ "maxAmount": "100", "priceSignal": "eth-usd", "maxNotional": "1" }),
        ),
        RuleConfig::new("recipient-whitelist", json!({ "addresses": [AAA] })),
    ]);
    let engine = engine_with(vec![doc]);
    let err = engine
        .prepare_config(&user(), &adapter(), &tx(BBB, 1), PrepareOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_denial());
}

// -- Time window -------------------------------------------------------------

#[tokio::test]
async fn time_window_config_has_no_extraneous_keys() {
    let doc = PolicyDocument::new(vec![RuleConfig::new(
        "time-window",
        json!({ "startHour": 9, "endHour": 17 }),
    )]);
    let engine = engine_with(vec![doc]);
    let config = engine
        .prepare_config(&user(), &adapter(), &tx(AAA, 1), PrepareOptions::default())
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&config).unwrap(),
        json!({ "timeWindow": { "enabled": true, "startHour": 9, "endHour": 17 } })
    );
}

#[tokio::test]
async fn later_document_overrides_earlier_for_same_kind() {
    let first = PolicyDocument::new(vec![RuleConfig::new(
        "time-window",
        json!({ "startHour": 1, "endHour": 2 }),
    )]);
    let second = PolicyDocument::new(vec![RuleConfig::new(
        "time-window",
        json!({ "startHour": 9, "endHour": 17 }),
    )]);
    let engine = engine_with(vec![first, second]);
    let config = engine
        .prepare_config(&user(), &adapter(), &tx(AAA, 1), PrepareOptions::default())
        .await
        .unwrap();
    let window = config.time_window.unwrap();
    assert_eq!((window.start_hour, window.end_hour), (9, 17));
}

#[tokio::test]
async fn no_documents_yields_empty_config() {
    let engine = engine_with(vec![]);
    let config = engine
        .prepare_config(&user(), &adapter(), &tx(AAA, 1), PrepareOptions::default())
        .await
        .unwrap();
    assert!(config.is_empty());
    assert_eq!(serde_json::to_value(&config).unwrap(), json!({}));
}

// -- Spend limit -------------------------------------------------------------

#[tokio::test]
async fn amount_over_limit_is_denied() {
    let doc = PolicyDocument::new(vec![RuleConfig::new(
        "spend-limit",
        json!({ "maxAmount": "1000" }),
    )]);
    let engine = engine_with(vec![doc]);
    let err = engine
        .prepare_config(&user(), &adapter(), &tx(AAA, 1001), PrepareOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Denied { kind: RuleKind::SpendLimit, .. }));

    let ok = engine
        .prepare_config(&user(), &adapter(), &tx(AAA, 1000), PrepareOptions::default())
        .await
        .unwrap();
    assert_eq!(ok.spend_limit.unwrap().max_amount, Amount::new(1000));
}

fn notional_doc() -> PolicyDocument {
    // At most 5000 quote units of notional for an 18-decimal token.
    PolicyDocument::new(vec![RuleConfig::new(
        "spend-limit",
        json!({
            "maxAmount": "1000000000000000000000",
            "priceSignal": "eth-usd",
            "maxNotional": "5000"
        }),
    )])
}

fn price_source(price: &str) -> Arc<dyn SignalSource> {
    Arc::new(StaticSignalSource::new().with_signal(
        "eth-usd",
        SignalData::new(at(1_700_000_000)).with_value("price", json!(price)),
    ))
}

#[tokio::test]
async fn notional_limit_varies_only_with_signal_value() {
    let engine = engine_with(vec![notional_doc()]);
    let two_tokens = 2_000_000_000_000_000_000;

    let cheap = PrepareOptions {
        signal_source: Some(price_source("2000")),
        ..PrepareOptions::default()
    };
    assert!(engine
        .prepare_config(&user(), &adapter(), &tx(AAA, two_tokens), cheap)
        .await
        .is_ok());

    let dear = PrepareOptions {
        signal_source: Some(price_source("3000")),
        ..PrepareOptions::default()
    };
    let err = engine
        .prepare_config(&user(), &adapter(), &tx(AAA, two_tokens), dear)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Denied { kind: RuleKind::SpendLimit, .. }));
}

#[tokio::test]
async fn notional_uses_full_precision_for_wide_products() {
    // amount * price needs more than 128 bits; the notional itself does not.
    let doc = PolicyDocument::new(vec![RuleConfig::new(
        "spend-limit",
        json!({
            "maxAmount": "1000000000000000000000000",
            "priceSignal": "eth-usd",
            "maxNotional": "1000000000000000000000000000000",
            "decimals": 18
        }),
    )]);
    let engine = engine_with(vec![doc]);
    let thousand_tokens = 1_000_000_000_000_000_000_000;

    let within = PrepareOptions {
        signal_source: Some(price_source("3000000000000000000000")),
        ..PrepareOptions::default()
    };
    let config = engine
        .prepare_config(&user(), &adapter(), &tx(AAA, thousand_tokens), within)
        .await
        .unwrap();
    assert!(config.spend_limit.is_some());

    let beyond = PrepareOptions {
        signal_source: Some(price_source("3000000000000000000000000000")),
        ..PrepareOptions::default()
    };
    let err = engine
        .prepare_config(&user(), &adapter(), &tx(AAA, thousand_tokens), beyond)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Denied { kind: RuleKind::SpendLimit, .. }));
}

#[tokio::test]
async fn missing_signal_source_is_infrastructure_error() {
    let engine = engine_with(vec![notional_doc()]);
    let err = engine
        .prepare_config(&user(), &adapter(), &tx(AAA, 1), PrepareOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    match err {
        EngineError::Infrastructure { rule, signal, .. } => {
            assert_eq!(rule, Some(RuleKind::SpendLimit));
            assert_eq!(signal.as_deref(), Some("eth-usd"));
        }
        other => panic!("expected infrastructure error, got {other:?}"),
    }
}

struct FailingSource;

#[async_trait]
impl SignalSource for FailingSource {
    async fn fetch(&self, name: &str) -> Result<SignalData, SignalError> {
        Err(SignalError::FetchFailed {
            name: name.to_string(),
            reason: "upstream timed out".into(),
        })
    }
}

#[tokio::test]
async fn failing_signal_is_never_a_denial() {
    let engine = engine_with(vec![notional_doc()]);
    let options = PrepareOptions {
        signal_source: Some(Arc::new(FailingSource)),
        ..PrepareOptions::default()
    };
    let err = engine
        .prepare_config(&user(), &adapter(), &tx(AAA, 1), options)
        .await
        .unwrap_err();
    assert!(!err.is_denial());
    assert!(err.to_string().contains("upstream timed out"));
}

#[tokio::test]
async fn non_integer_price_is_infrastructure_error() {
    let engine = engine_with(vec![notional_doc()]);
    let options = PrepareOptions {
        signal_source: Some(price_source("2000.5")),
        ..PrepareOptions::default()
    };
    let err = engine
        .prepare_config(&user(), &adapter(), &tx(AAA, 1), options)
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}

// -- Velocity ----------------------------------------------------------------

fn velocity_doc(secs: u64) -> PolicyDocument {
    PolicyDocument::new(vec![RuleConfig::new(
        "velocity",
        json!({ "minIntervalSeconds": secs }),
    )])
}

#[tokio::test]
async fn velocity_denies_inside_interval() {
    let engine = engine_with(vec![velocity_doc(600)]);
    let options = PrepareOptions {
        last_execution_time: Some(at(1_700_000_000)),
        ..options_at(1_700_000_300)
    };
    let err = engine
        .prepare_config(&user(), &adapter(), &tx(AAA, 1), options)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Denied { kind: RuleKind::Velocity, .. }));
}

#[tokio::test]
async fn velocity_allows_after_interval_and_records_last_execution() {
    let engine = engine_with(vec![velocity_doc(600)]);
    let options = PrepareOptions {
        last_execution_time: Some(at(1_700_000_000)),
        ..options_at(1_700_000_600)
    };
    let config = engine
        .prepare_config(&user(), &adapter(), &tx(AAA, 1), options)
        .await
        .unwrap();
    let velocity = config.velocity.unwrap();
    assert_eq!(velocity.min_interval_seconds, 600);
    assert_eq!(velocity.last_execution_time, Some(1_700_000_000));
}

#[tokio::test]
async fn velocity_without_history_passes() {
    let engine = engine_with(vec![velocity_doc(600)]);
    let config = engine
        .prepare_config(&user(), &adapter(), &tx(AAA, 1), options_at(1_700_000_000))
        .await
        .unwrap();
    assert_eq!(config.velocity.unwrap().last_execution_time, None);
}

// -- Store and request failures ----------------------------------------------

struct DownStore;

#[async_trait]
impl PolicyStore for DownStore {
    async fn get_user_policies(
        &self,
        _user: &Address,
        _adapter: &AdapterId,
    ) -> Result<Vec<PolicyDocument>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

#[tokio::test]
async fn store_outage_is_infrastructure_error() {
    let engine = PolicyEngine::new(validator(), Arc::new(DownStore));
    let err = engine
        .prepare_config(&user(), &adapter(), &tx(AAA, 1), PrepareOptions::default())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Infrastructure {
            rule: None,
            signal: None,
            reason: "policy store unavailable: connection refused".into(),
        }
    );
}

#[tokio::test]
async fn invalid_stored_document_is_schema_error() {
    let doc = PolicyDocument::new(vec![RuleConfig::new("geo-fence", json!({}))]);
    let engine = engine_with(vec![doc]);
    let err = engine
        .prepare_config(&user(), &adapter(), &tx(AAA, 1), PrepareOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Schema(_)));
}

#[tokio::test]
async fn transaction_from_other_adapter_is_rejected() {
    let engine = engine_with(vec![whitelist(&[AAA])]);
    let mut foreign = tx(AAA, 1);
    foreign.adapter_id = AdapterId::new("native-transfer").unwrap();
    let err = engine
        .prepare_config(&user(), &adapter(), &foreign, PrepareOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));
}
