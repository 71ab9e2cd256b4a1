//! # Policy Context
//!
//! Per-evaluation input shared by every rule of one engine invocation. Built
//! by the engine, never persisted, never shared between attempts.

use polyseal_core::{AdapterId, Address, ProposedTransaction, Timestamp};

use crate::signal::SignalSnapshot;

/// Everything a rule may read while preparing its fragment.
#[derive(Debug, Clone)]
pub struct PolicyContext {
    pub user: Address,
    pub adapter_id: AdapterId,
    pub transaction: ProposedTransaction,
    /// Previous execution of this adapter for this user, if any.
    pub last_execution_time: Option<Timestamp>,
    /// Reference instant for rate checks.
    pub evaluated_at: Timestamp,
    pub signals: SignalSnapshot,
}

impl PolicyContext {
    /// A context with no signals and no execution history.
    pub fn new(
        user: Address,
        adapter_id: AdapterId,
        transaction: ProposedTransaction,
        evaluated_at: Timestamp,
    ) -> Self {
        Self {
            user,
            adapter_id,
            transaction,
            last_execution_time: None,
            evaluated_at,
            signals: SignalSnapshot::new(),
        }
    }

    pub fn with_last_execution_time(mut self, last: Option<Timestamp>) -> Self {
        self.last_execution_time = last;
        self
    }

    pub fn with_signals(mut self, signals: SignalSnapshot) -> Self {
        self.signals = signals;
        self
    }
}
