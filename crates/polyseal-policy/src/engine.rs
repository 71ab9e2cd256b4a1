//! # Policy Engine
//!
//! Orchestrates one authorization attempt:
//!
//! 1. Load the user's documents for the adapter from the [`PolicyStore`] and
//!    compile them (later documents override earlier ones per kind).
//! 2. Fetch every signal the compiled rules need, concurrently, and wait for
//!    all of them.
//! 3. Run each rule in priority order against one shared [`PolicyContext`]
//!    and merge the fragments by disjoint union.
//! 4. Stop at the first denial and report it with the denying rule's kind.
//!
//! ## Determinism
//!
//! For a fixed compiled policy and context, [`PolicyEngine::prepare_compiled`]
//! returns the same `PolicyConfig` every time. Only signal-dependent rules
//! (spend-limit with a price signal) may change outcome, and only when the
//! signal value changes.
//!
//! ## Concurrency
//!
//! The engine holds only read-only shared state, so many attempts may run at
//! once. Signal fetches for one attempt run on a `JoinSet`; there is no
//! partial merge.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::task::JoinSet;

use polyseal_core::{AdapterId, Address, ProposedTransaction, Timestamp};

use crate::compiler::{CompiledPolicy, PolicyCompiler};
use crate::config::PolicyConfig;
use crate::context::PolicyContext;
use crate::error::{EngineError, RuleError, SignalError};
use crate::registry::RuleRegistry;
use crate::signal::{SignalSnapshot, SignalSource};
use crate::store::PolicyStore;
use crate::validate::DocumentValidator;

/// Caller-supplied inputs for one evaluation.
#[derive(Clone, Default)]
pub struct PrepareOptions {
    pub signal_source: Option<Arc<dyn SignalSource>>,
    pub last_execution_time: Option<Timestamp>,
    /// Reference instant for rate checks; the current time when absent.
    pub evaluated_at: Option<Timestamp>,
}

impl std::fmt::Debug for PrepareOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrepareOptions")
            .field("signal_source", &self.signal_source.is_some())
            .field("last_execution_time", &self.last_execution_time)
            .field("evaluated_at", &self.evaluated_at)
            .finish()
    }
}

/// The policy engine. Cheap to clone.
#[derive(Clone)]
pub struct PolicyEngine {
    validator: Arc<DocumentValidator>,
    store: Arc<dyn PolicyStore>,
}

impl PolicyEngine {
    pub fn new(validator: Arc<DocumentValidator>, store: Arc<dyn PolicyStore>) -> Self {
        Self { validator, store }
    }

    pub fn registry(&self) -> &RuleRegistry {
        self.validator.registry()
    }

    pub fn validator(&self) -> &DocumentValidator {
        &self.validator
    }

    /// Load and compile the user's active policy for `adapter`.
    pub async fn load_policy(
        &self,
        user: &Address,
        adapter: &AdapterId,
    ) -> Result<CompiledPolicy, EngineError> {
        let documents = self
            .store
            .get_user_policies(user, adapter)
            .await
            .map_err(|e| {
                tracing::warn!(%user, %adapter, error = %e, "policy store lookup failed");
                EngineError::Infrastructure {
                    rule: None,
                    signal: None,
                    reason: e.to_string(),
                }
            })?;

        let mut validated = Vec::with_capacity(documents.len());
        for document in &documents {
            let checked = self.validator.check(document).map_err(|e| {
                tracing::error!(%user, %adapter, error = %e, "stored policy document is invalid");
                e
            })?;
            validated.push(checked);
        }
        Ok(PolicyCompiler::compile_all(&validated))
    }

    /// Resolve the user's policy and prepare the merged configuration for
    /// `transaction`.
    pub async fn prepare_config(
        &self,
        user: &Address,
        adapter: &AdapterId,
        transaction: &ProposedTransaction,
        options: PrepareOptions,
    ) -> Result<PolicyConfig, EngineError> {
        if &transaction.adapter_id != adapter {
            return Err(EngineError::InvalidRequest(format!(
                "transaction was built by adapter {} but policy requested for {adapter}",
                transaction.adapter_id
            )));
        }

        let policy = self.load_policy(user, adapter).await?;
        if policy.is_empty() {
            tracing::warn!(%user, %adapter, "no policy rules configured");
        }

        let signals = gather_signals(&policy, options.signal_source.as_ref()).await?;
        let ctx = PolicyContext::new(
            user.clone(),
            adapter.clone(),
            transaction.clone(),
            options.evaluated_at.unwrap_or_else(Timestamp::now),
        )
        .with_last_execution_time(options.last_execution_time)
        .with_signals(signals);

        self.prepare_compiled(&policy, &ctx)
    }

    /// Run the compiled rules against a prepared context. No I/O.
    pub fn prepare_compiled(
        &self,
        policy: &CompiledPolicy,
        ctx: &PolicyContext,
    ) -> Result<PolicyConfig, EngineError> {
        let mut config = PolicyConfig::default();
        for rule in policy.rules() {
            let kind = rule.kind();
            match self.registry().prepare(rule, ctx) {
                Ok(fragment) => config
                    .insert(fragment)
                    .map_err(|e| EngineError::Internal(e.to_string()))?,
                Err(RuleError::Denied { reason }) => {
                    tracing::info!(user = %ctx.user, rule = %kind, %reason, "policy denied");
                    return Err(EngineError::Denied { kind, reason });
                }
                Err(RuleError::Infrastructure { signal, reason }) => {
                    tracing::warn!(user = %ctx.user, rule = %kind, ?signal, %reason, "rule could not be evaluated");
                    return Err(EngineError::Infrastructure {
                        rule: Some(kind),
                        signal,
                        reason,
                    });
                }
                Err(RuleError::Internal(reason)) => {
                    tracing::error!(rule = %kind, %reason, "rule failed on validated parameters");
                    return Err(EngineError::Internal(reason));
                }
            }
        }
        tracing::debug!(user = %ctx.user, rules = ?config.kinds(), "policy config prepared");
        Ok(config)
    }
}

impl std::fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEngine")
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

/// Fetch every signal `policy` depends on, concurrently.
///
/// Individual fetch failures are recorded in the snapshot and surface as an
/// infrastructure error from the rule that reads them, so a denial by a
/// higher-priority rule is still reported as a denial.
pub async fn gather_signals(
    policy: &CompiledPolicy,
    source: Option<&Arc<dyn SignalSource>>,
) -> Result<SignalSnapshot, EngineError> {
    let names: BTreeSet<String> = policy
        .signal_requirements()
        .into_iter()
        .map(|(_, name)| name)
        .collect();
    let mut snapshot = SignalSnapshot::new();
    if names.is_empty() {
        return Ok(snapshot);
    }

    let Some(source) = source else {
        for name in names {
            let err = SignalError::FetchFailed {
                name: name.clone(),
                reason: "no signal source configured".into(),
            };
            snapshot.record(name, Err(err));
        }
        return Ok(snapshot);
    };

    let mut tasks = JoinSet::new();
    for name in names {
        let source = Arc::clone(source);
        tasks.spawn(async move {
            let result = source.fetch(&name).await;
            (name, result)
        });
    }
    while let Some(joined) = tasks.join_next().await {
        let (name, result) = joined.map_err(|e| EngineError::Infrastructure {
            rule: None,
            signal: None,
            reason: format!("signal fetch task failed: {e}"),
        })?;
        if let Err(e) = &result {
            tracing::warn!(signal = %name, error = %e, "signal fetch failed");
        }
        snapshot.record(name, result);
    }
    Ok(snapshot)
}
