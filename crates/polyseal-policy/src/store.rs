//! # Policy Store
//!
//! Persistence of user policies is external; the engine only needs
//! [`PolicyStore::get_user_policies`]. [`InMemoryPolicyStore`] backs tests,
//! the CLI and single-process deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use polyseal_core::{AdapterId, Address};

use crate::document::PolicyDocument;
use crate::error::StoreError;

/// Lookup of a user's active policy documents for one adapter.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Documents in authoring order. Later documents override earlier ones
    /// for the same rule kind when compiled together.
    async fn get_user_policies(
        &self,
        user: &Address,
        adapter: &AdapterId,
    ) -> Result<Vec<PolicyDocument>, StoreError>;
}

type Key = (Address, AdapterId);

/// Thread-safe, cloneable in-memory store keyed by `(user, adapter)`.
///
/// The lock is `parking_lot` and is never held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPolicyStore {
    data: Arc<RwLock<HashMap<Key, Vec<PolicyDocument>>>>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a document after any existing ones.
    pub fn insert(&self, user: Address, adapter: AdapterId, document: PolicyDocument) {
        self.data
            .write()
            .entry((user, adapter))
            .or_default()
            .push(document);
    }

    /// Replace all documents for the key, returning the previous set.
    pub fn replace(
        &self,
        user: Address,
        adapter: AdapterId,
        documents: Vec<PolicyDocument>,
    ) -> Vec<PolicyDocument> {
        self.data
            .write()
            .insert((user, adapter), documents)
            .unwrap_or_default()
    }

    pub fn remove(&self, user: &Address, adapter: &AdapterId) -> Vec<PolicyDocument> {
        self.data
            .write()
            .remove(&(user.clone(), adapter.clone()))
            .unwrap_or_default()
    }

    /// Number of `(user, adapter)` keys with stored documents.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn get_user_policies(
        &self,
        user: &Address,
        adapter: &AdapterId,
    ) -> Result<Vec<PolicyDocument>, StoreError> {
        Ok(self
            .data
            .read()
            .get(&(user.clone(), adapter.clone()))
            .cloned()
            .unwrap_or_default())
    }
}
