//! # Proof Service Integration Tests
//!
//! Backend outages, timeouts, serialization of concurrent requests, and the
//! production proof policy.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use polyseal_core::{AdapterId, Address, Amount, AssetId, ChainId, ProposedTransaction, Timestamp};
use polyseal_policy::{PolicyConfig, TimeWindowFragment};
use polyseal_proof::{
    build_witness, BackendError, BackendFactory, BackendKind, CompiledCircuit, FieldElement,
    MockBackend, ProofPolicy, ProofService, ProofServiceConfig, ProofServiceError,
    ProvingBackend, Witness,
};

fn tx() -> ProposedTransaction {
    ProposedTransaction {
        chain: ChainId::new("eip155:1").unwrap(),
        adapter_id: AdapterId::new("erc20-transfer").unwrap(),
        recipient: Address::from_bytes([0xaa; 20]),
        asset: AssetId::new("usdc").unwrap(),
        amount: Amount::new(10),
        metadata: Default::default(),
    }
}

fn witness() -> Witness {
    let config = PolicyConfig {
        time_window: Some(TimeWindowFragment {
            enabled: true,
            start_hour: 0,
            end_hour: 23,
        }),
        ..PolicyConfig::default()
    };
    build_witness(&config, &tx(), &Timestamp::from_unix_seconds(1_700_000_000).unwrap()).unwrap()
}

fn config(timeout: Duration) -> ProofServiceConfig {
    ProofServiceConfig {
        prove_timeout: timeout,
        policy: ProofPolicy::development(),
    }
}

/// Wraps the mock; fails or stalls according to shared switches.
struct ScriptedBackend {
    inner: MockBackend,
    unreachable: Arc<AtomicBool>,
    stall: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ProvingBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Mock
    }

    fn prove(&self, circuit: &CompiledCircuit, witness: &Witness) -> Result<Vec<u8>, BackendError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(stall) = self.stall {
            std::thread::sleep(stall);
        }
        let result = if self.unreachable.load(Ordering::SeqCst) {
            Err(BackendError::Unavailable("connection reset".into()))
        } else {
            self.inner.prove(circuit, witness)
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn verify(
        &self,
        circuit: &CompiledCircuit,
        proof: &[u8],
        public_inputs: &[FieldElement],
    ) -> Result<bool, BackendError> {
        self.inner.verify(circuit, proof, public_inputs)
    }
}

#[derive(Clone, Default)]
struct Script {
    created: Arc<AtomicUsize>,
    unreachable: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    stall: Option<Duration>,
}

impl BackendFactory for Script {
    fn create(&self) -> Result<Arc<dyn ProvingBackend>, BackendError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(ScriptedBackend {
            inner: MockBackend::new(),
            unreachable: Arc::clone(&self.unreachable),
            stall: self.stall,
            in_flight: Arc::clone(&self.in_flight),
            max_in_flight: Arc::clone(&self.max_in_flight),
        }))
    }
}

fn service(script: &Script, timeout: Duration) -> ProofService {
    ProofService::new(
        Arc::new(CompiledCircuit::development()),
        Arc::new(script.clone()),
        config(timeout),
    )
    .unwrap()
}

#[tokio::test]
async fn unreachable_backend_is_retryable_and_recovers_after_reinit() {
    let script = Script::default();
    let svc = service(&script, Duration::from_secs(5));
    // One verifier plus one prover at startup.
    assert_eq!(script.created.load(Ordering::SeqCst), 2);

    script.unreachable.store(true, Ordering::SeqCst);
    let err = svc.generate_proof(witness()).await.unwrap_err();
    assert!(err.is_retryable(), "{err}");
    assert!(matches!(err, ProofServiceError::Backend(BackendError::Unavailable(_))));
    assert!(!svc.has_prover());

    script.unreachable.store(false, Ordering::SeqCst);
    svc.reinitialize().await.unwrap();
    assert_eq!(script.created.load(Ordering::SeqCst), 3);

    let result = svc.generate_proof(witness()).await.unwrap();
    assert!(svc
        .verify_proof(&result.proof, &result.public_inputs, result.backend)
        .unwrap());
}

#[tokio::test]
async fn discarded_prover_is_rebuilt_lazily() {
    let script = Script::default();
    let svc = service(&script, Duration::from_secs(5));
    script.unreachable.store(true, Ordering::SeqCst);
    assert!(svc.generate_proof(witness()).await.is_err());
    script.unreachable.store(false, Ordering::SeqCst);

    assert!(svc.generate_proof(witness()).await.is_ok());
    assert_eq!(script.created.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn timeout_discards_prover() {
    let script = Script {
        stall: Some(Duration::from_millis(300)),
        ..Script::default()
    };
    let svc = service(&script, Duration::from_millis(20));
    let err = svc.generate_proof(witness()).await.unwrap_err();
    assert!(matches!(err, ProofServiceError::Timeout { .. }));
    assert!(err.is_retryable());
    assert!(!svc.has_prover());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_are_serialized() {
    let script = Script {
        stall: Some(Duration::from_millis(10)),
        ..Script::default()
    };
    let svc = Arc::new(service(&script, Duration::from_secs(5)));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let svc = Arc::clone(&svc);
        handles.push(tokio::spawn(async move { svc.generate_proof(witness()).await }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(script.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn same_witness_yields_same_proof_but_new_request() {
    let svc = service(&Script::default(), Duration::from_secs(5));
    let a = svc.generate_proof(witness()).await.unwrap();
    let b = svc.generate_proof(witness()).await.unwrap();
    assert_eq!(a.proof, b.proof);
    assert_ne!(a.request_id, b.request_id);
    assert_eq!(&a.circuit_digest, svc.circuit_digest());
}

#[tokio::test]
async fn production_policy_refuses_mock() {
    let factory = || -> Result<Arc<dyn ProvingBackend>, BackendError> {
        Ok(Arc::new(MockBackend::new()))
    };
    let svc = ProofService::new(
        Arc::new(CompiledCircuit::development()),
        Arc::new(factory),
        ProofServiceConfig {
            prove_timeout: Duration::from_secs(5),
            policy: ProofPolicy::production(),
        },
    )
    .unwrap();
    let err = svc.generate_proof(witness()).await.unwrap_err();
    assert!(matches!(err, ProofServiceError::Policy(_)));
    assert!(!err.is_retryable());
    assert!(svc
        .verify_proof(&[0u8; 32], &witness().public_inputs, BackendKind::Mock)
        .is_err());
}

#[tokio::test]
async fn abi_version_mismatch_is_fatal() {
    let svc = service(&Script::default(), Duration::from_secs(5));
    let mut w = witness();
    w.abi_version = 2;
    let err = svc.generate_proof(w).await.unwrap_err();
    assert!(matches!(err, ProofServiceError::AbiVersion { witness: 2, circuit: 1 }));
    assert!(!err.is_retryable());
}

#[test]
fn verifier_must_start() {
    let factory = || -> Result<Arc<dyn ProvingBackend>, BackendError> {
        Err(BackendError::Unavailable("no device".into()))
    };
    let err = ProofService::new(
        Arc::new(CompiledCircuit::development()),
        Arc::new(factory),
        config(Duration::from_secs(1)),
    )
    .unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn foreign_backend_proof_does_not_verify() {
    let svc = service(&Script::default(), Duration::from_secs(5));
    let result = svc.generate_proof(witness()).await.unwrap();
    assert!(!svc
        .verify_proof(&result.proof, &result.public_inputs, BackendKind::External)
        .unwrap());
}
