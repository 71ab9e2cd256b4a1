//! # Signals
//!
//! Externally fetched context (prices, rates) that a rule may consult. The
//! engine fetches every signal a compiled policy needs concurrently before
//! any rule runs; rules then read from an immutable [`SignalSnapshot`].

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use polyseal_core::Timestamp;

use crate::error::SignalError;

/// One fetched signal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalData {
    /// When the source observed the value.
    pub timestamp: Timestamp,
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

impl SignalData {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }
}

/// A provider of named signals.
#[async_trait]
pub trait SignalSource: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<SignalData, SignalError>;
}

/// Fixed in-memory signals, for tests and offline evaluation.
#[derive(Debug, Clone, Default)]
pub struct StaticSignalSource {
    signals: HashMap<String, SignalData>,
}

impl StaticSignalSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signal(mut self, name: impl Into<String>, data: SignalData) -> Self {
        self.signals.insert(name.into(), data);
        self
    }
}

#[async_trait]
impl SignalSource for StaticSignalSource {
    async fn fetch(&self, name: &str) -> Result<SignalData, SignalError> {
        self.signals
            .get(name)
            .cloned()
            .ok_or_else(|| SignalError::NotFound(name.to_string()))
    }
}

/// Results of every signal fetch for one evaluation, failures included.
#[derive(Debug, Clone, Default)]
pub struct SignalSnapshot {
    results: BTreeMap<String, Result<SignalData, SignalError>>,
}

impl SignalSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: impl Into<String>, result: Result<SignalData, SignalError>) {
        self.results.insert(name.into(), result);
    }

    /// The fetched value, or the error that prevented fetching it. A name
    /// that was never requested reports `NotFound`.
    pub fn get(&self, name: &str) -> Result<&SignalData, SignalError> {
        match self.results.get(name) {
            Some(Ok(data)) => Ok(data),
            Some(Err(e)) => Err(e.clone()),
            None => Err(SignalError::NotFound(name.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
