//! In-memory storage implementation for testing.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::instrument;

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    validate_policy, PolicyStore, StoredDiscountPolicy, ISSUE_TYPE_PRODUCT, ISSUE_TYPE_SELLER,
};

/// In-memory implementation of PolicyStore.
///
/// # Performance Characteristics
///
/// - **Insert policy**: O(1) average
/// - **Find applicable**: O(T * P) where T is distinct targets requested and
///   P is policies stored per target
///
/// Uses DashMap for thread-safe concurrent access without locks, with a
/// secondary index from (issue type, target id) to policy ids.
#[derive(Debug, Default)]
pub struct MemoryPolicyStore {
    policies: DashMap<String, StoredDiscountPolicy>,
    /// Secondary index: (issue_type, target_id) -> policy ids.
    by_target: DashMap<(String, u64), Vec<String>>,
}

impl MemoryPolicyStore {
    /// Creates a new in-memory policy store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory policy store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the number of stored policies.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Picks the most recently activated applicable policy for one target.
    fn latest_applicable(
        &self,
        issue_type: &str,
        target_id: u64,
        at: DateTime<Utc>,
    ) -> Option<StoredDiscountPolicy> {
        let ids = self.by_target.get(&(issue_type.to_string(), target_id))?;
        ids.iter()
            .filter_map(|id| self.policies.get(id).map(|p| p.value().clone()))
            .filter(|p| p.is_applicable_at(at))
            .max_by(|a, b| {
                a.valid_from
                    .cmp(&b.valid_from)
                    .then_with(|| a.created_at.cmp(&b.created_at))
                    .then_with(|| a.id.cmp(&b.id))
            })
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    #[instrument(skip(self, policy), fields(policy_id = %policy.id))]
    async fn insert_policy(
        &self,
        policy: StoredDiscountPolicy,
    ) -> StorageResult<StoredDiscountPolicy> {
        validate_policy(&policy)?;

        // Use atomic entry API to prevent race condition between check and insert
        use dashmap::mapref::entry::Entry;
        match self.policies.entry(policy.id.clone()) {
            Entry::Occupied(_) => {
                return Err(StorageError::DuplicatePolicy {
                    policy_id: policy.id,
                });
            }
            Entry::Vacant(entry) => {
                entry.insert(policy.clone());
            }
        }

        self.by_target
            .entry((policy.issue_type.clone(), policy.target_id))
            .or_default()
            .push(policy.id.clone());

        Ok(policy)
    }

    #[instrument(skip(self))]
    async fn deactivate_policy(&self, policy_id: &str) -> StorageResult<StoredDiscountPolicy> {
        let mut policy = self
            .policies
            .get_mut(policy_id)
            .ok_or_else(|| StorageError::PolicyNotFound {
                policy_id: policy_id.to_string(),
            })?;
        policy.active = false;
        Ok(policy.value().clone())
    }

    async fn get_policy(&self, policy_id: &str) -> StorageResult<StoredDiscountPolicy> {
        self.policies
            .get(policy_id)
            .map(|p| p.value().clone())
            .ok_or_else(|| StorageError::PolicyNotFound {
                policy_id: policy_id.to_string(),
            })
    }

    #[instrument(skip(self, product_ids, seller_ids), fields(products = product_ids.len(), sellers = seller_ids.len()))]
    async fn find_applicable(
        &self,
        product_ids: &[u64],
        seller_ids: &[u64],
        at: DateTime<Utc>,
    ) -> StorageResult<Vec<StoredDiscountPolicy>> {
        let product_ids: BTreeSet<u64> = product_ids.iter().copied().collect();
        let seller_ids: BTreeSet<u64> = seller_ids.iter().copied().collect();

        let products = product_ids
            .into_iter()
            .filter_map(|id| self.latest_applicable(ISSUE_TYPE_PRODUCT, id, at));
        let sellers = seller_ids
            .into_iter()
            .filter_map(|id| self.latest_applicable(ISSUE_TYPE_SELLER, id, at));

        Ok(products.chain(sellers).collect())
    }
}
