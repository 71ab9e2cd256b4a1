//! # Application State
//!
//! Everything a handler needs, built once at startup and shared through
//! `Arc`. Cloning [`AppState`] is cheap.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use polyseal_policy::{
    DocumentValidator, InMemoryPolicyStore, PolicyEngine, RegistryError, RuleRegistry,
    SignalSource,
};
use polyseal_proof::policy::PROOF_POLICY_ENV;
use polyseal_proof::{
    BackendError, CircuitError, CompiledCircuit, MockBackend, ProofPolicy, ProofService,
    ProofServiceConfig, ProofServiceError, ProvingBackend, DEFAULT_PROVE_TIMEOUT,
};

pub const PORT_ENV: &str = "PORT";
pub const PROVE_TIMEOUT_ENV: &str = "POLYSEAL_PROVE_TIMEOUT_SECS";
pub const CIRCUIT_PATH_ENV: &str = "POLYSEAL_CIRCUIT_PATH";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    pub prove_timeout: Duration,
    pub proof_policy: ProofPolicy,
    /// Compiled circuit artifact. The built-in development circuit is used
    /// when absent.
    pub circuit_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            prove_timeout: DEFAULT_PROVE_TIMEOUT,
            proof_policy: ProofPolicy::from_setting(None),
            circuit_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to
    /// the defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = match lookup(PORT_ENV) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "invalid {PORT_ENV}; using {}", defaults.port);
                defaults.port
            }),
            None => defaults.port,
        };

        let prove_timeout = match lookup(PROVE_TIMEOUT_ENV) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!(value = %raw, "invalid {PROVE_TIMEOUT_ENV}; using default");
                    defaults.prove_timeout
                }
            },
            None => defaults.prove_timeout,
        };

        let proof_policy = ProofPolicy::from_setting(lookup(PROOF_POLICY_ENV).as_deref());

        let circuit_path = lookup(CIRCUIT_PATH_ENV)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        Self {
            port,
            prove_timeout,
            proof_policy,
            circuit_path,
        }
    }
}

/// Startup failures. The server does not come up without all components.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("rule registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("compiled circuit: {0}")]
    Circuit(#[from] CircuitError),

    #[error("proof service: {0}")]
    Proof(#[from] ProofServiceError),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub validator: Arc<DocumentValidator>,
    pub store: InMemoryPolicyStore,
    pub engine: PolicyEngine,
    pub proofs: Arc<ProofService>,
    pub signal_source: Option<Arc<dyn SignalSource>>,
}

impl AppState {
    /// Development state: built-in circuit, mock backend, no signal source.
    pub fn new() -> Result<Self, StateError> {
        Self::with_config(AppConfig {
            proof_policy: ProofPolicy::development(),
            ..AppConfig::default()
        })
    }

    pub fn with_config(config: AppConfig) -> Result<Self, StateError> {
        let circuit = match &config.circuit_path {
            Some(path) => CompiledCircuit::load(path)?,
            None => {
                tracing::warn!("no compiled circuit configured; using development circuit");
                CompiledCircuit::development()
            }
        };

        let factory = || -> Result<Arc<dyn ProvingBackend>, BackendError> {
            Ok(Arc::new(MockBackend::new()))
        };
        let proofs = ProofService::new(
            Arc::new(circuit),
            Arc::new(factory),
            ProofServiceConfig {
                prove_timeout: config.prove_timeout,
                policy: config.proof_policy,
            },
        )?;

        let registry = Arc::new(RuleRegistry::with_default_hasher()?);
        let validator = Arc::new(DocumentValidator::new(registry)?);
        let store = InMemoryPolicyStore::new();
        let engine = PolicyEngine::new(Arc::clone(&validator), Arc::new(store.clone()));

        Ok(Self {
            config: Arc::new(config),
            validator,
            store,
            engine,
            proofs: Arc::new(proofs),
            signal_source: None,
        })
    }

    /// Attach the market-data source used by signal-dependent rules.
    pub fn with_signal_source(mut self, source: Arc<dyn SignalSource>) -> Self {
        self.signal_source = Some(source);
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("policies", &self.store.len())
            .field("proofs", &self.proofs)
            .field("signal_source", &self.signal_source.is_some())
            .finish()
    }
}
